//! RFC 8288 Web Links, as found in `Link` headers and `application/link-format` bodies.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{is_not, take_while1},
    character::complete::{char, multispace0},
    combinator::{all_consuming, map, opt},
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, tuple},
    IResult,
};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid Link syntax near: '{0}'")]
pub struct LinkError(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebLink {
    pub target: String,
    pub params: Vec<(String, String)>,
}

impl WebLink {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), params: Vec::new() }
    }

    pub fn rel(self, rel: &str) -> Self {
        self.param("rel", rel)
    }

    pub fn param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.params.push((name.to_string(), value.into()));
        self
    }

    /// First value of `name`; parameter names compare case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    /// A `rel` value may hold several space-separated relation types.
    pub fn has_rel(&self, rel: &str) -> bool {
        self.get("rel").map_or(false, |rels| rels.split_whitespace().any(|r| r.eq_ignore_ascii_case(rel)))
    }
}

impl fmt::Display for WebLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.target)?;
        for (name, value) in &self.params {
            write!(f, "; {}=\"{}\"", name, value.replace('\\', "\\\\").replace('"', "\\\""))?;
        }
        Ok(())
    }
}

/// Joins links into a link-format document, one link per line.
pub fn format_links(links: &[WebLink]) -> String {
    links.iter().map(WebLink::to_string).collect::<Vec<_>>().join(",\n")
}

/// Parses a `Link` header value or a link-format body.
pub fn parse_links(input: &str) -> Result<Vec<WebLink>, LinkError> {
    match all_consuming(delimited(multispace0, separated_list0(list_separator, link), multispace0))(input) {
        Ok((_, links)) => Ok(links),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(LinkError(near(e.input))),
        Err(nom::Err::Incomplete(_)) => Err(LinkError(near(input))),
    }
}

fn near(input: &str) -> String {
    if input.chars().count() > 20 {
        format!("{}...", input.chars().take(20).collect::<String>())
    } else {
        input.to_string()
    }
}

// --- GRAMMAR ---

fn list_separator(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn link(input: &str) -> IResult<&str, WebLink> {
    let (input, target) = delimited(char('<'), opt(is_not(">")), char('>'))(input)?;
    let (input, params) = many0(preceded(tuple((multispace0, char(';'), multispace0)), param))(input)?;
    Ok((input, WebLink { target: target.unwrap_or_default().trim().to_string(), params }))
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~/:".contains(c)
}

fn param(input: &str) -> IResult<&str, (String, String)> {
    let (input, name) = take_while1(|c: char| is_token_char(c) && c != '/' && c != ':')(input)?;
    let (input, value) = opt(preceded(
        tuple((multispace0, char('='), multispace0)),
        alt((quoted, map(take_while1(is_token_char), str::to_string))),
    ))(input)?;
    Ok((input, (name.to_ascii_lowercase(), value.unwrap_or_default())))
}

fn quoted(input: &str) -> IResult<&str, String> {
    let (rest, _) = char('"')(input)?;
    let mut out = String::new();
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&rest[i + 1..], out)),
            '\\' => match chars.next() {
                Some((_, escaped)) => out.push(escaped),
                None => break,
            },
            _ => out.push(c),
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char)))
}
