mod ast;
mod daterange;
mod error;
mod lexer;
mod parser;
mod predicates;

pub use ast::*;
pub use daterange::{DateRange, Period, add, add_period, round_down, round_up, week_start};
pub use error::{ParseError, SearchError, SearchErrorKind, TokenError};
pub use lexer::{LexMode, Lexer, Token, TokenKind, lex};
pub use parser::{SearchParser, parse_search};
