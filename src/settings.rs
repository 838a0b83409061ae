use std::path::PathBuf;

use anyhow::Result;

use pipeline::{Stage, StageSet};

use crate::args::Args;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No stages selected: use --stages or --from")]
    NoStagesSelected,
    #[error("Use either --stages or --from, not both")]
    ConflictingSelection,
    #[error("Config file \"{0}\" does not exist")]
    ConfigNotFound(String),
    #[error("Invalid config path has no parent (should not happen)")]
    ConfigHasNoParent,
}

/// Settings are like Args, except all the logic has
/// been applied so e.g. stage names are parsed and the config path is absolute.
#[derive(Debug)]
pub struct Settings {
    pub config: PathBuf,
    pub selection: StageSet,
    pub job_check: bool,
    pub uid: Option<String>,
    pub yes: bool,
    pub verbose: u8,
    pub dry_run: bool,
}

impl TryFrom<Args> for Settings {
    type Error = anyhow::Error;
    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let selection = match (&args.from, args.stages.is_empty()) {
            (Some(_), false) => return Err(Error::ConflictingSelection.into()),
            (Some(from), true) => StageSet::starting_from(from.parse::<Stage>()?),
            (None, _) => args
                .stages
                .iter()
                .map(|token| token.parse::<Stage>())
                .collect::<Result<StageSet, _>>()?,
        };
        if selection.is_empty() {
            return Err(Error::NoStagesSelected.into());
        }

        let config = PathBuf::from(&args.config);
        if !config.exists() {
            return Err(Error::ConfigNotFound(args.config).into());
        }
        let config = config.canonicalize()?;

        Ok(Self {
            config,
            selection,
            job_check: args.job_check,
            uid: args.uid,
            yes: args.yes,
            verbose: args.verbose,
            dry_run: args.dry_run,
        })
    }
}
