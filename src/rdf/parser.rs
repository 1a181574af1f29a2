//! Reader for the Turtle family (Turtle, N3 documents without formulae,
//! N-Triples) and for the `INSERT DATA` / `DELETE DATA` subset of SPARQL
//! Update used by PATCH.
//!
//! Turtle goes through sophia's parser. An update request is split by nom
//! into its prologue and data blocks; each block is then read as Turtle
//! under the prologue's prefixes.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until},
    character::complete::{char, multispace0, multispace1},
    combinator::{recognize, value},
    multi::many0,
    sequence::{delimited, tuple},
    IResult,
};
use sophia_api::parser::TripleParser;
use sophia_api::source::TripleSource;
use sophia_inmem::graph::LightGraph;
use sophia_iri::Iri;
use sophia_turtle::parser::turtle::TurtleParser;

use super::{Graph, RdfError};

/// One operation of a SPARQL Update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOp {
    Insert(Graph),
    Delete(Graph),
}

/// Parses a Turtle document. Relative IRIs resolve against `base`.
///
/// The final `.` of a document may be left out.
pub fn parse_turtle(input: &str, base: Option<&str>) -> Result<Graph, RdfError> {
    let parser = TurtleParser { base: base_iri(base)? };
    match read(&parser, input) {
        Err(err) if !input.trim_end().ends_with('.') => read(&parser, &format!("{}\n.", input)).map_err(|_| err),
        result => result,
    }
}

fn read(parser: &TurtleParser, input: &str) -> Result<Graph, RdfError> {
    let graph: LightGraph =
        parser.parse_str(input).collect_triples().map_err(|e| RdfError::Syntax(e.to_string()))?;
    Graph::from_sophia(&graph)
}

fn base_iri(base: Option<&str>) -> Result<Option<Iri<String>>, RdfError> {
    match base.filter(|b| !b.is_empty()) {
        Some(b) => Iri::new(b.to_string()).map(Some).map_err(|_| RdfError::BadIri(b.to_string())),
        None => Ok(None),
    }
}

/// Parses a SPARQL Update request made of `INSERT DATA` / `DELETE DATA`
/// operations separated by `;`.
pub fn parse_update(input: &str, base: Option<&str>) -> Result<Vec<UpdateOp>, RdfError> {
    let mut prologue = String::new();
    let mut ops = Vec::new();
    let mut rest = input;

    loop {
        let (r, directives) = many0(delimited(multispace0, directive, multispace0))(rest).map_err(syntax)?;
        for d in directives {
            prologue.push_str(d);
            prologue.push('\n');
        }
        let (r, _) = multispace0::<&str, nom::error::Error<&str>>(r).map_err(syntax)?;
        if r.is_empty() {
            break;
        }

        let (r, (insert, block)) = update_op(r).map_err(syntax)?;
        let graph = parse_turtle(&format!("{}{}", prologue, block), base)?;
        ops.push(if insert { UpdateOp::Insert(graph) } else { UpdateOp::Delete(graph) });

        let (r, _) = multispace0::<&str, nom::error::Error<&str>>(r).map_err(syntax)?;
        rest = match char::<&str, nom::error::Error<&str>>(';')(r) {
            Ok((r, _)) => r,
            Err(_) if r.is_empty() => r,
            Err(_) => return Err(RdfError::Syntax(near(r))),
        };
    }
    Ok(ops)
}

// --- ERRORS ---

fn near(input: &str) -> String {
    if input.chars().count() > 20 {
        format!("near '{}...'", input.chars().take(20).collect::<String>())
    } else {
        format!("near '{}'", input)
    }
}

fn syntax(err: nom::Err<nom::error::Error<&str>>) -> RdfError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => RdfError::Syntax(near(e.input)),
        nom::Err::Incomplete(_) => RdfError::Syntax("unexpected end of update".to_string()),
    }
}

// --- UPDATE ---

/// `PREFIX p: <iri>` or `BASE <iri>`, kept verbatim.
fn directive(input: &str) -> IResult<&str, &str> {
    recognize(tuple((alt((tag_no_case("PREFIX"), tag_no_case("BASE"))), multispace1, take_until(">"), tag(">"))))(
        input,
    )
}

fn update_op(input: &str) -> IResult<&str, (bool, &str)> {
    let (input, insert) = alt((value(true, tag_no_case("INSERT")), value(false, tag_no_case("DELETE"))))(input)?;
    let (input, _) = tuple((multispace1, tag_no_case("DATA"), multispace0))(input)?;
    let (input, block) = data_block(input)?;
    Ok((input, (insert, block)))
}

/// The text between a `{` and its matching `}`. Braces inside string
/// literals, IRIs and comments do not count.
fn data_block(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('{')(input)?;
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'<' => i = skip_past(bytes, i + 1, b'>'),
            b'#' => i = skip_past(bytes, i + 1, b'\n'),
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Ok((&body[i + 1..], &body[..i])),
            b'}' => {
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}

/// Index just past the string literal opening at `start`.
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let long = bytes.get(start..start + 3) == Some(&[quote; 3][..]);
    let mut i = start + if long { 3 } else { 1 };
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
        } else if long && bytes.get(i..i + 3) == Some(&[quote; 3][..]) {
            return i + 3;
        } else if !long && bytes[i] == quote {
            return i + 1;
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_past(bytes: &[u8], from: usize, end: u8) -> usize {
    let from = from.min(bytes.len());
    bytes[from..].iter().position(|&b| b == end).map_or(bytes.len(), |p| from + p + 1)
}
