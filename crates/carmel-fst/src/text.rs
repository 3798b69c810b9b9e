// Legible text format.
//
//   FINAL
//   (SRC (DEST IN [OUT] [WEIGHT[!GROUP]]) ...)
//   ...
//
// Symbols and state names are bare atoms or double-quoted strings with
// `\"` and `\\` escapes; `*e*` is epsilon. A single symbol makes an
// acceptor arc. A trailing unquoted atom that parses as a weight is the
// weight (default 1). `!N` puts the arc in tie group N, a bare `!` locks
// it. States are numbered by first mention, so the first group's source
// is the start state.

use std::fmt::{self, Write};
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use carmel_core::{EPSILON, EPSILON_NAME, Symbol, Weight};
use tracing::debug;

use crate::WfstError;
use crate::arc::Group;
use crate::build::WfstBuilder;
use crate::config::TextFormat;
use crate::wfst::{Side, Wfst};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Atom { text: String, quoted: bool },
}

struct Lexer<'a> {
    chars: Peekable<CharIndices<'a>>,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Lexer {
            chars: text.char_indices().peekable(),
            line: 1,
        }
    }

    fn error(&self, message: impl Into<String>) -> WfstError {
        WfstError::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn skip_space(&mut self) {
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                self.line += 1;
            } else if !c.is_whitespace() {
                break;
            }
            self.chars.next();
        }
    }

    /// The next token and the line it starts on.
    fn next_token(&mut self) -> Result<Option<(Token, usize)>, WfstError> {
        self.skip_space();
        let line = self.line;
        let Some((_, c)) = self.chars.next() else {
            return Ok(None);
        };
        let token = match c {
            '(' => Token::Open,
            ')' => Token::Close,
            '"' => Token::Atom {
                text: self.quoted()?,
                quoted: true,
            },
            _ => {
                let mut text = String::from(c);
                while let Some(&(_, c)) = self.chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    text.push(c);
                    self.chars.next();
                }
                Token::Atom {
                    text,
                    quoted: false,
                }
            }
        };
        Ok(Some((token, line)))
    }

    fn quoted(&mut self) -> Result<String, WfstError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None => return Err(self.error("unterminated quoted string")),
                Some((_, '"')) => return Ok(text),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c @ ('"' | '\\'))) => text.push(c),
                    Some((_, c)) => return Err(self.error(format!("unknown escape `\\{c}`"))),
                    None => return Err(self.error("unterminated quoted string")),
                },
                Some((_, c)) => {
                    if c == '\n' {
                        self.line += 1;
                    }
                    text.push(c);
                }
            }
        }
    }
}

/// Split `0.5!3` into a weight and a group.
fn parse_weight_token(text: &str) -> Result<(Weight, Group), String> {
    let (weight, group) = match text.split_once('!') {
        Some((w, g)) => (w, Some(g)),
        None => (text, None),
    };
    let weight: Weight = weight.parse().map_err(|e: carmel_core::WeightParseError| e.to_string())?;
    let group = match group {
        None => Group::Free,
        Some("") => Group::Locked,
        Some(id) => {
            let id: u32 = id.parse().map_err(|_| format!("bad group label `{id}`"))?;
            Group::tied(id).ok_or_else(|| "tie group labels start at 1".to_string())?
        }
    };
    Ok((weight, group))
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<(Token, usize)>,
}

impl Parser<'_> {
    fn next(&mut self) -> Result<Option<(Token, usize)>, WfstError> {
        match self.peeked.take() {
            Some(t) => Ok(Some(t)),
            None => self.lexer.next_token(),
        }
    }

    fn expect_atom(&mut self, what: &str) -> Result<String, WfstError> {
        match self.next()? {
            Some((Token::Atom { text, .. }, _)) => Ok(text),
            Some((other, line)) => Err(WfstError::Parse {
                line,
                message: format!("expected {what}, found {other:?}"),
            }),
            None => Err(self.lexer.error(format!("expected {what}, found end of input"))),
        }
    }

    /// Parse `(DEST sym [sym] [weight])` after its opening parenthesis.
    fn arc(&mut self, builder: &mut WfstBuilder, source: &str) -> Result<(), WfstError> {
        let dest = self.expect_atom("destination state")?;
        let mut items: Vec<(String, bool)> = Vec::new();
        let line = loop {
            match self.next()? {
                Some((Token::Atom { text, quoted }, _)) => items.push((text, quoted)),
                Some((Token::Close, line)) => break line,
                Some((Token::Open, line)) => {
                    return Err(WfstError::Parse {
                        line,
                        message: "unexpected `(` inside an arc".into(),
                    });
                }
                None => return Err(self.lexer.error("unterminated arc")),
            }
        };
        let parse_error = |message: String| WfstError::Parse { line, message };
        let weight_of = |item: &(String, bool)| {
            if item.1 {
                Err(format!("quoted `{}` where a weight was expected", item.0))
            } else {
                parse_weight_token(&item.0)
            }
        };
        let (input, output, weight, group) = match items.as_slice() {
            [] => return Err(parse_error("arc without symbols".into())),
            [sym] => (&sym.0, &sym.0, Weight::one(), Group::Free),
            [first, second] => match weight_of(second) {
                Ok((w, g)) => (&first.0, &first.0, w, g),
                Err(_) => (&first.0, &second.0, Weight::one(), Group::Free),
            },
            [input, output, weight] => {
                let (w, g) = weight_of(weight).map_err(parse_error)?;
                (&input.0, &output.0, w, g)
            }
            _ => return Err(parse_error(format!("too many fields in arc ({})", items.len()))),
        };
        builder.arc_with(source, &dest, input, output, weight, group);
        Ok(())
    }
}

/// Parse an automaton from its legible text form.
pub fn read_wfst(text: &str) -> Result<Wfst, WfstError> {
    let mut parser = Parser {
        lexer: Lexer::new(text),
        peeked: None,
    };
    let mut builder = WfstBuilder::new();
    let final_name = parser.expect_atom("final state name")?;
    builder.final_state(&final_name);

    while let Some((token, line)) = parser.next()? {
        if token != Token::Open {
            return Err(WfstError::Parse {
                line,
                message: format!("expected `(`, found {token:?}"),
            });
        }
        let source = parser.expect_atom("source state")?;
        builder.state(&source);
        loop {
            match parser.next()? {
                Some((Token::Close, _)) => break,
                Some((Token::Open, _)) => parser.arc(&mut builder, &source)?,
                Some((other, line)) => {
                    return Err(WfstError::Parse {
                        line,
                        message: format!("expected an arc, found {other:?}"),
                    });
                }
                None => return Err(parser.lexer.error("unterminated state group")),
            }
        }
    }
    let wfst = builder.build()?;
    debug!(states = wfst.num_states(), arcs = wfst.num_arcs(), "parsed automaton");
    Ok(wfst)
}

impl FromStr for Wfst {
    type Err = WfstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        read_wfst(s)
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '"' | '\\'))
}

fn write_quoted<W: Write>(out: &mut W, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.write_char('\\')?;
        }
        out.write_char(c)?;
    }
    out.write_char('"')
}

fn write_state<W: Write>(out: &mut W, name: &str) -> fmt::Result {
    if needs_quotes(name) {
        write_quoted(out, name)
    } else {
        out.write_str(name)
    }
}

fn write_symbol<W: Write>(out: &mut W, wfst: &Wfst, side: Side, symbol: Symbol) -> fmt::Result {
    if symbol == EPSILON {
        return out.write_str(EPSILON_NAME);
    }
    let name = wfst.alphabet(side).name(symbol).unwrap_or("?");
    write_quoted(out, name)
}

/// Write `wfst` in legible text form. The automaton must be valid.
pub fn write_wfst<W: Write>(wfst: &Wfst, format: &TextFormat, out: &mut W) -> Result<(), WfstError> {
    let final_state = wfst.ensure_valid()?;
    let io = |_: fmt::Error| WfstError::Internal("formatter failed");
    write_state(out, &wfst.state_name(final_state)).map_err(io)?;
    out.write_char('\n').map_err(io)?;

    for (s, state) in wfst.states().iter().enumerate() {
        // The start state is always written so it keeps index 0.
        if state.is_empty() && s != wfst.start() {
            continue;
        }
        let name = wfst.state_name(s);
        let open_state = |out: &mut W| -> fmt::Result {
            out.write_char('(')?;
            write_state(out, &name)
        };
        if !format.arc_per_line || state.is_empty() {
            open_state(out).map_err(io)?;
        }
        for arc in state.arcs() {
            let mut line = || -> fmt::Result {
                if format.arc_per_line {
                    open_state(out)?;
                }
                out.write_str(" (")?;
                write_state(out, &wfst.state_name(arc.dest))?;
                out.write_char(' ')?;
                write_symbol(out, wfst, Side::Input, arc.input)?;
                out.write_char(' ')?;
                write_symbol(out, wfst, Side::Output, arc.output)?;
                if !arc.weight.is_one() || !arc.group.is_free() {
                    write!(out, " {}", arc.weight.display(format.weights))?;
                    match arc.group {
                        Group::Free => {}
                        Group::Locked => out.write_char('!')?,
                        Group::Tied(id) => write!(out, "!{id}")?,
                    }
                }
                out.write_char(')')?;
                if format.arc_per_line {
                    out.write_str(")\n")?;
                }
                Ok(())
            };
            line().map_err(io)?;
        }
        if !format.arc_per_line || state.is_empty() {
            out.write_str(")\n").map_err(io)?;
        }
    }
    Ok(())
}

impl Wfst {
    /// The legible text form of this automaton.
    pub fn to_text(&self, format: &TextFormat) -> Result<String, WfstError> {
        let mut out = String::new();
        write_wfst(self, format, &mut out)?;
        Ok(out)
    }
}
