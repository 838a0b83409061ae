/// type alias just to make type signatures look more consistent.
pub type Ident<'a> = &'a str;

/// The right-hand side of a config assignment.
#[derive(Debug, PartialEq, Eq)]
pub enum Value<'a> {
    /// unquoted_value_without_spaces, or "a quoted value" with no variables in it
    Literal(&'a str),
    /// "$fastq_dir/log", with the names of the variables referenced
    Interp { text: &'a str, vars: Vec<Ident<'a>> },
}

/// A single top-level item in a config file.
#[derive(Debug, PartialEq, Eq)]
pub enum Item<'a> {
    /// key = value
    Assignment { key: Ident<'a>, value: Value<'a> },
    /// include "relative/or/absolute/path.conf"
    Include(&'a str),
}

// These methods are just to assist with writing more legible tests.
#[cfg(test)]
impl<'a> Item<'a> {
    pub fn literal(key: Ident<'a>, val: &'a str) -> Self {
        Self::Assignment {
            key,
            value: Value::Literal(val),
        }
    }
    pub fn interp(key: Ident<'a>, text: &'a str, vars: Vec<Ident<'a>>) -> Self {
        Self::Assignment {
            key,
            value: Value::Interp { text, vars },
        }
    }
}
