use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, tag_no_case, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, value},
    sequence::{delimited, preceded, tuple},
    IResult,
};

use crate::rdf::RdfFormat;

#[derive(Debug, PartialEq, Clone)]
pub enum Command {
    Get { path: String, format: Option<RdfFormat>, at: Option<String> },
    Versions { path: String },
    Snapshot { path: String, at: Option<String>, body: Option<String> },
    Put { path: String, versioned: bool, body: String },
    DeleteVersions { path: String },
    Delete { path: String },
    Help,
    Exit,
}

// --- BASIC PARSERS ---

fn parse_path(input: &str) -> IResult<&str, String> {
    map(take_while1(|c: char| !c.is_whitespace() && c != '"'), |p: &str| {
        if p.starts_with('/') {
            p.to_string()
        } else {
            format!("/{}", p)
        }
    })(input)
}

/// `"..."` with `\"`, `\\` and `\n` escapes.
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let escaped = nom::bytes::complete::escaped_transform(
        is_not("\\\""),
        '\\',
        alt((value("\\", tag("\\")), value("\"", tag("\"")), value("\n", tag("n")))),
    );
    delimited(char('"'), map(opt(escaped), Option::unwrap_or_default), char('"'))(input)
}

fn parse_format(input: &str) -> IResult<&str, RdfFormat> {
    alt((
        value(RdfFormat::Turtle, tag_ci("TURTLE")),
        value(RdfFormat::NTriples, tag_ci("NTRIPLES")),
        value(RdfFormat::JsonLd, tag_ci("JSONLD")),
    ))(input)
}

// --- HELPERS ---
fn ws<'a, F, O, E: nom::error::ParseError<&'a str>>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

fn tag_ci(t: &'static str) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| tag_no_case(t)(input)
}

fn parse_at(input: &str) -> IResult<&str, String> {
    preceded(ws(tag_ci("AT")), parse_quoted_string)(input)
}

// --- COMMAND PARSERS ---

fn parse_get(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("GET")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, path) = parse_path(input)?;
    let (input, at) = opt(parse_at)(input)?;
    let (input, format) = opt(preceded(ws(tag_ci("AS")), parse_format))(input)?;
    Ok((input, Command::Get { path, format, at }))
}

fn parse_versions(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("VERSIONS"), tag_ci("HISTORY")))(input)?;
    let (input, _) = multispace1(input)?;
    let (input, path) = parse_path(input)?;
    Ok((input, Command::Versions { path }))
}

fn parse_snapshot(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("SNAPSHOT")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, path) = parse_path(input)?;
    let (input, at) = opt(parse_at)(input)?;
    let (input, body) = opt(preceded(ws(tag_ci("BODY")), parse_quoted_string))(input)?;
    Ok((input, Command::Snapshot { path, at, body }))
}

fn parse_put(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("PUT")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, path) = parse_path(input)?;
    let (input, versioned) = map(opt(ws(tag_ci("VERSIONED"))), |v| v.is_some())(input)?;
    let (input, _) = multispace0(input)?;
    let (input, body) = parse_quoted_string(input)?;
    Ok((input, Command::Put { path, versioned, body }))
}

fn parse_delete(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("DELETE")(input)?;
    let (input, _) = multispace1(input)?;
    let (input, versions) = opt(tuple((tag_ci("VERSIONS"), multispace1)))(input)?;
    let (input, path) = parse_path(input)?;
    let cmd = match versions {
        Some(_) => Command::DeleteVersions { path },
        None => Command::Delete { path },
    };
    Ok((input, cmd))
}

fn parse_help(input: &str) -> IResult<&str, Command> {
    let (input, _) = tag_ci("HELP")(input)?;
    Ok((input, Command::Help))
}

fn parse_exit(input: &str) -> IResult<&str, Command> {
    let (input, _) = alt((tag_ci("EXIT"), tag_ci("QUIT")))(input)?;
    Ok((input, Command::Exit))
}

pub fn parse_command(input: &str) -> Result<Command, String> {
    let input = input.trim();
    let result = alt((
        parse_get,
        parse_versions,
        parse_snapshot,
        parse_put,
        parse_delete,
        parse_help,
        parse_exit,
    ))(input);

    match result {
        Ok((remainder, cmd)) => {
            if !remainder.trim().is_empty() {
                return Err(format!("Unexpected tokens at end: '{}'", remainder));
            }
            Ok(cmd)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let context: String = e.input.chars().take(20).collect();
            if context.len() < e.input.len() {
                Err(format!("Invalid syntax near: '{}...'", context))
            } else {
                Err(format!("Invalid syntax near: '{}'", context))
            }
        }
        Err(nom::Err::Incomplete(_)) => Err("Incomplete command.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_variants() {
        assert_eq!(
            parse_command("GET /c").unwrap(),
            Command::Get { path: "/c".into(), format: None, at: None }
        );
        assert_eq!(
            parse_command("get c as ntriples").unwrap(),
            Command::Get { path: "/c".into(), format: Some(RdfFormat::NTriples), at: None }
        );
        assert_eq!(
            parse_command("GET /c AT \"Sat, 1 Jan 2000 00:00:00 GMT\" AS JSONLD").unwrap(),
            Command::Get {
                path: "/c".into(),
                format: Some(RdfFormat::JsonLd),
                at: Some("Sat, 1 Jan 2000 00:00:00 GMT".into())
            }
        );
    }

    #[test]
    fn parses_snapshot_with_date_and_body() {
        let cmd = parse_command(r#"SNAPSHOT /c AT "Sat, 1 Jan 2000 00:00:00 GMT" BODY "<> <info:test#label> \"bar\" .""#)
            .unwrap();
        assert_eq!(
            cmd,
            Command::Snapshot {
                path: "/c".into(),
                at: Some("Sat, 1 Jan 2000 00:00:00 GMT".into()),
                body: Some("<> <info:test#label> \"bar\" .".into()),
            }
        );
        assert_eq!(
            parse_command("snapshot /c").unwrap(),
            Command::Snapshot { path: "/c".into(), at: None, body: None }
        );
    }

    #[test]
    fn parses_put_and_deletes() {
        assert_eq!(
            parse_command("PUT /c VERSIONED \"\"").unwrap(),
            Command::Put { path: "/c".into(), versioned: true, body: String::new() }
        );
        assert_eq!(
            parse_command("PUT /c \"<> <info:p> \\\"o\\\" .\"").unwrap(),
            Command::Put { path: "/c".into(), versioned: false, body: "<> <info:p> \"o\" .".into() }
        );
        assert_eq!(parse_command("DELETE VERSIONS /c").unwrap(), Command::DeleteVersions { path: "/c".into() });
        assert_eq!(parse_command("DELETE /c").unwrap(), Command::Delete { path: "/c".into() });
        assert_eq!(parse_command("VERSIONS /c").unwrap(), Command::Versions { path: "/c".into() });
        assert_eq!(parse_command("quit").unwrap(), Command::Exit);
    }

    #[test]
    fn reports_where_parsing_failed() {
        let err = parse_command("PUT /c VERSIONED unquoted body that runs on").unwrap_err();
        assert!(err.starts_with("Invalid syntax near: '") || err.starts_with("Unexpected tokens"), "{}", err);
        assert!(parse_command("GET /c AS XML").is_err());
    }
}
