//! Per-crate debug flags
//!
//! `--debug-imageclass-session` raises one tracing target to debug level
//! without flooding the console with everything else. `--debug-all` and the
//! `IMAGECLASS_DEBUG` environment variable are also understood.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

const FLAG_PREFIX: &str = "--debug-";
const ALL: &str = "all";

/// Tracing targets raised to debug level
///
/// ```rust
/// use imageclass_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_args(vec!["--debug-imageclass-session".to_string()]);
/// assert!(flags.is_enabled("imageclass-session"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrateDebugFlags {
    targets: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Collect `--debug-<target>` and `--debug-all` from `args`; other arguments are ignored
    pub fn from_args<I>(args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut flags = Self::default();
        for arg in args {
            if let Some(target) = arg.strip_prefix(FLAG_PREFIX) {
                flags.enable(target);
            }
        }
        flags
    }

    /// Enable one target, or every known one for `all`
    pub fn enable(&mut self, target: &str) {
        let target = target.trim();
        if target == ALL {
            self.targets.extend(KNOWN_CRATES.iter().map(|name| name.to_string()));
        } else if !target.is_empty() {
            self.targets.insert(target.to_string());
        }
    }

    pub fn is_enabled(&self, target: &str) -> bool {
        self.targets.contains(target)
    }

    pub fn any_enabled(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Enabled targets in name order
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }

    /// `EnvFilter` directives: each enabled target at debug, then `default_level`
    ///
    /// e.g. `"imageclass-cli=debug,imageclass-session=debug,warn"`
    pub fn to_filter_string_with_default(&self, default_level: &str) -> String {
        self.targets()
            .map(|target| format!("{}=debug", target))
            .chain(std::iter::once(default_level.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Debug flags from the process arguments merged with `IMAGECLASS_DEBUG`
///
/// The variable holds comma-separated target names, or `all`.
pub fn parse_debug_flags() -> CrateDebugFlags {
    let mut flags = CrateDebugFlags::from_args(env::args());
    if let Ok(value) = env::var("IMAGECLASS_DEBUG") {
        merge_env_flags(&mut flags, &value);
    }
    flags
}

fn merge_env_flags(flags: &mut CrateDebugFlags, value: &str) {
    for target in value.split(',') {
        flags.enable(target);
    }
}

/// Drop `--debug-*` arguments so the rest can go to a strict parser
pub fn strip_debug_flags<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter().filter(|arg| !arg.starts_with(FLAG_PREFIX)).collect()
}

/// Usage text for the debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug-all                    Debug logging for every imageclass crate
  --debug-<target>               Debug logging for one crate

Targets:
  {}

Environment:
  IMAGECLASS_DEBUG=<target>[,<target>]   Same as the flags, comma-separated
  IMAGECLASS_DEBUG=all
"#,
        KNOWN_CRATES.join(", ")
    )
}
