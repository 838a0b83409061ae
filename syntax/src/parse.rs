use anyhow::Result;

#[derive(Debug, thiserror::Error)]
#[error("ParseError on line {line_num} ('{line}'): {msg}")]
pub struct Error {
    msg: String,
    line_num: usize,
    line: String,
}

/// Parse the full text of a run config file into a list of items.
pub fn parse(text: &str) -> Result<Vec<crate::ast::Item<'_>>> {
    use combine::EasyParser;
    config_file::items()
        .easy_parse(text)
        .map(|(items, _remainder)| items)
        .map_err(|e| {
            let e = e.map_position(|p| p.translate_position(text));
            let pos = e.position;
            // isolate the line in question:
            let before = &text[0..pos];
            let after = &text[pos..];
            let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
            let line_end = after.find('\n').map(|i| pos + i).unwrap_or(text.len());
            // since converting combine's errors is a lifetime nightmare,
            // we just stringify the error before returning it.
            Error {
                line_num: before.matches('\n').count() + 1,
                line: text[line_start..line_end].to_owned(),
                msg: format!("{}", e),
            }
            .into()
        })
}

pub mod prelude {
    pub use combine::parser::char::{char, string};
    pub use combine::parser::range::recognize;
    pub use combine::*;
}

pub mod util {

    use super::prelude::*;
    use combine::parser::char::{alpha_num, letter, space};

    p! {
        ident_start() -> char, {
            char('_').or(letter())
        }
    }

    p! {
        ident_rest() -> (), {
            skip_many(char('_').or(alpha_num()))
        }
    }

    // config keys mirror the tool names they configure, so mixed case is allowed
    // (e.g. "slurm_peakCalling").
    p! {
        ident() -> &'a str, {
            recognize(ident_start().and(ident_rest()))
        }
    }

    p! {
        comment() -> (), {
            char('#').with(skip_many(none_of("\n".chars())))
        }
    }

    p! {
        whitespace() -> (), {
            skip_many1(
                space().map(|_| ()).or(comment())
            )
        }
    }

    p! {
        line_internal_whitespace() -> (), {
            skip_many1(satisfy(|c: char| c.is_whitespace() && c != '\n'))
        }
    }

    wrapper! {
        lex_inline(parser), {
            optional(line_internal_whitespace())
                .with(parser)
                .skip(optional(line_internal_whitespace()))
        }
    }

    wrapper! {
        double_quotes(parser), {
            char('"').with(parser).skip(char('"'))
        }
    }

    // end of an item: optional trailing comment, then newline (plus any blank lines) or eof.
    p! {
        eol() -> (), {
            optional(comment()).with(
                eof().or(char('\n').and(optional(whitespace())).map(|_| ()))
            )
        }
    }

}

mod value {

    use super::prelude::*;
    use super::util::{double_quotes, ident};
    use crate::ast::Value;
    use combine::parser::range::recognize_with_value;

    const FORBID_UNQUOTED: [char; 4] = ['#', '"', '$', '='];

    p! {
        unquoted_literal() -> &'a str, {
            recognize(skip_many1(satisfy(|c: char|
                !c.is_whitespace() && !FORBID_UNQUOTED.contains(&c)
            )))
        }
    }

    // a "$" that doesn't start an identifier (e.g. awk's "$3") is kept as plain text.
    p! {
        interp_piece() -> Option<&'a str>, {
            choice!(
                attempt(char('$').with(ident())).map(Some),
                skip_many1(none_of("$\"\n".chars())).map(|_| None),
                char('$').map(|_| None)
            )
        }
    }

    p! {
        interp_content() -> (&'a str, Vec<&'a str>), {
            recognize_with_value(many::<Vec<Option<&'a str>>, _, _>(interp_piece()))
                .map(|(text, pieces)| (text, pieces.into_iter().flatten().collect()))
        }
    }

    p! {
        double_quoted_value() -> Value<'a>, {
            double_quotes(interp_content()).map(|(text, vars)| {
                if vars.is_empty() {
                    Value::Literal(text)
                } else {
                    Value::Interp { text, vars }
                }
            })
        }
    }

    p! {
        value() -> Value<'a>, {
            double_quoted_value().or(unquoted_literal().map(Value::Literal))
        }
    }

}

mod config_file {

    use super::prelude::*;
    use super::util::{double_quotes, eol, ident, lex_inline, line_internal_whitespace, whitespace};
    use super::value::value;
    use crate::ast::Item;

    p! {
        assignment() -> Item<'a>, {
            lex_inline(ident())
                .skip(char('='))
                .and(lex_inline(value()))
                .skip(eol())
                .map(|(key, value)| Item::Assignment { key, value })
        }
    }

    p! {
        include() -> Item<'a>, {
            attempt(
                string("include")
                    .skip(line_internal_whitespace())
                    .with(double_quotes(recognize(skip_many(none_of("\"\n".chars())))))
            )
            .skip(optional(line_internal_whitespace()))
            .skip(eol())
            .map(Item::Include)
        }
    }

    p! {
        item() -> Item<'a>, {
            include().or(assignment())
        }
    }

    p! {
        items() -> Vec<Item<'a>>, {
            optional(whitespace()).with(many(item())).skip(eof())
        }
    }
}
