use std::io::{self, Write};

use chronos_ldp::parser::{self, Command};
use chronos_ldp::rdf::vocab::MEMENTO_ORIGINAL_RESOURCE;
use chronos_ldp::rdf::RdfFormat;
use clap::Parser;
use reqwest::{Client, Method, RequestBuilder, Response};

const TURTLE: &str = "text/turtle";
const LINK_FORMAT: &str = "application/link-format";

#[derive(Parser, Clone, Debug)]
#[clap(author, version, about = "Interactive client for a chronos-ldp repository", long_about = None)]
struct Args {
    #[clap(long, default_value = "http://127.0.0.1:8080")]
    url: String,
}

fn main() {
    let args = Args::parse();
    let base = args.url.trim_end_matches('/').to_string();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            println!("[\u{2717}] Could not start runtime: {}", e);
            return;
        }
    };
    runtime.block_on(repl(base));
}

async fn repl(base: String) {
    print_banner();
    let client = Client::new();

    match client.get(format!("{}/", base)).send().await {
        Ok(_) => println!("[\u{2713}] Connected to repository at {}!", base),
        Err(_) => {
            println!("[\u{2717}] Could not connect to repository at {}.", base);
            println!("    Make sure to run 'cargo run --release --bin chronos-ldp' in another terminal.");
            return;
        }
    }
    println!("Type 'HELP' for supported commands or 'EXIT' to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        print!("chronos> ");
        io::stdout().flush().ok();
        buffer.clear();

        match stdin.read_line(&mut buffer) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        if buffer.trim().is_empty() {
            continue;
        }

        match parser::parse_command(&buffer) {
            Ok(Command::Exit) => break,
            Ok(cmd) => {
                if let Err(e) = execute_command(&client, &base, cmd).await {
                    println!("[\u{26a0}\u{fe0f} Error] {}", e);
                }
            }
            Err(e) => {
                println!("[\u{2717} Syntax Error] {}", e);
                if buffer.to_uppercase().starts_with("PUT") {
                    println!("    \u{2139}\u{fe0f}  Hint: Bodies are quoted Turtle: PUT /c \"<> <info:p> \\\"o\\\" .\"");
                }
            }
        }
    }
}

fn print_banner() {
    println!("\n==================================================");
    println!("   Chronos LDP CLI - Versioned Linked Data");
    println!("==================================================\n");
}

fn print_help() {
    println!("\n--- Available Commands ---");
    println!("1. READ:        GET /path [AS TURTLE|NTRIPLES|JSONLD]");
    println!("2. TIME TRAVEL: GET /path AT \"Sat, 1 Jan 2000 00:00:00 GMT\"");
    println!("3. WRITE:       PUT /path [VERSIONED] \"<> <info:p> \\\"o\\\" .\"");
    println!("4. VERSIONS:    VERSIONS /path");
    println!("5. SNAPSHOT:    SNAPSHOT /path [AT \"...\"] [BODY \"...\"]");
    println!("6. DROP:        DELETE VERSIONS /path");
    println!("7. DELETE:      DELETE /path");
    println!("8. EXIT:        Quit\n");
}

async fn execute_command(client: &Client, base: &str, cmd: Command) -> Result<(), String> {
    let versions = |path: &str| format!("{}{}/fcr:versions", base, path.trim_end_matches('/'));

    match cmd {
        Command::Help => {
            print_help();
            Ok(())
        }
        Command::Get { path, format, at } => {
            let accept = format.map_or(TURTLE, RdfFormat::media_type);
            let mut req = client.get(format!("{}{}", base, path)).header("accept", accept);
            if let Some(at) = at {
                req = req.header("accept-datetime", at);
            }
            let res = send(req).await?;
            if let Some(datetime) = header(&res, "memento-datetime") {
                println!("[\u{23f1}\u{fe0f} Time Travel] {} as of {}", res.url(), datetime);
            }
            print_body(res).await
        }
        Command::Versions { path } => {
            let res = send(client.get(versions(&path)).header("accept", LINK_FORMAT)).await?;
            println!("History for {}:", path);
            let body = res.text().await.map_err(|e| e.to_string())?;
            for line in body.lines().filter(|l| l.contains("rel=\"memento\"")) {
                println!("  {}", line.trim_end_matches(','));
            }
            Ok(())
        }
        Command::Snapshot { path, at, body } => {
            let mut req = client.post(versions(&path));
            if let Some(at) = at {
                req = req.header("memento-datetime", at);
            }
            if let Some(body) = body {
                req = req.header("content-type", TURTLE).body(body);
            }
            let res = send(req).await?;
            println!("[\u{2713} OK] Memento {}", header(&res, "location").unwrap_or_default());
            Ok(())
        }
        Command::Put { path, versioned, body } => {
            let mut req = client.request(Method::PUT, format!("{}{}", base, path)).header("content-type", TURTLE);
            if versioned {
                req = req.header("link", format!("<{}>; rel=\"type\"", MEMENTO_ORIGINAL_RESOURCE));
            }
            let res = send(req.body(body)).await?;
            println!("[\u{2713} OK] {} {}", res.status(), path);
            Ok(())
        }
        Command::DeleteVersions { path } => {
            send(client.delete(versions(&path))).await?;
            println!("[\u{2713} OK] Dropped versions of {}", path);
            Ok(())
        }
        Command::Delete { path } => {
            send(client.delete(format!("{}{}", base, path))).await?;
            println!("[\u{2713} OK] Deleted {}", path);
            Ok(())
        }
        Command::Exit => Ok(()),
    }
}

// --- NETWORK HANDLERS ---

/// Sends `req`, turning error statuses into their plain-text message.
async fn send(req: RequestBuilder) -> Result<Response, String> {
    let res = req.send().await.map_err(|e| e.to_string())?;
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let message = res.text().await.unwrap_or_default();
    Err(format!("{} {}", status, message.trim()))
}

fn header(res: &Response, name: &str) -> Option<String> {
    res.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn print_body(res: Response) -> Result<(), String> {
    let body = res.text().await.map_err(|e| e.to_string())?;
    println!("{}", body.trim_end());
    Ok(())
}
