//! Common types shared across commands

use clap::Parser;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Suppress debug and trace output, overriding -v (warnings and errors still print)")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for debug, -vv for trace)")]
    pub verbose: u8,

    #[arg(long, global = true, help = "Do not write plugpack.log")]
    pub no_log_file: bool,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: warnings and errors only
    /// - 1: debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
            no_log_file: false,
        };
        assert_eq!(opts.verbosity_level(), 0);
    }

    #[test]
    fn test_verbose_count() {
        let opts = GlobalOpts {
            verbose: 2,
            ..GlobalOpts::default()
        };
        assert_eq!(opts.verbosity_level(), 2);
    }

    #[test]
    fn test_quiet_flag_keeps_warnings() {
        use clap::CommandFactory;

        let Ok(opts) = GlobalOpts::try_parse_from(["plugpack", "-q", "-vv"]) else {
            panic!("flags did not parse");
        };
        assert_eq!(opts.verbosity_level(), 0);

        let command = GlobalOpts::command();
        let help = command
            .get_arguments()
            .find(|arg| arg.get_id() == "quiet")
            .and_then(|arg| arg.get_help())
            .map(ToString::to_string)
            .unwrap_or_default();
        assert!(help.contains("warnings and errors still print"));
    }
}
