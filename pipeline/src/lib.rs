mod stage;
pub use stage::{Stage, StageSet, UnknownStage};

mod job;
pub use job::{Dependency, DependencyMode, JobId, WaitCondition};

mod command;
pub use command::{quote, ShellCommand};

mod config;
pub use config::{Error as ConfigError, Key, RawConfig, RunConfig};

mod context;
pub use context::{Error as ContextError, LogRegistry, RunContext, StageOutcome};

mod sample;
pub use sample::{sample_token, SampleSet, R1_SUFFIX, R2_SUFFIX};
