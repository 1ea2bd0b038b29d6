use crate::collectors::all_schemas;
use clap::{Arg, ArgAction, Command};

/// Add `--collector.<family>` and `--no-collector.<family>` for every family.
pub fn add_families_args(mut cmd: Command) -> Command {
    for schema in all_schemas() {
        let name = schema.name;

        let enable_flag: &'static str = Box::leak(format!("collector.{name}").into_boxed_str());
        let disable_flag: &'static str =
            Box::leak(format!("no-collector.{name}").into_boxed_str());

        let default_indicator = if schema.enabled_by_default {
            " [default: enabled]"
        } else {
            " [default: disabled]"
        };
        let enable_help: &'static str = Box::leak(
            format!("Enable the {name} family{default_indicator}").into_boxed_str(),
        );
        let disable_help: &'static str =
            Box::leak(format!("Disable the {name} family").into_boxed_str());

        cmd = cmd
            .arg(
                Arg::new(enable_flag)
                    .long(enable_flag)
                    .help(enable_help)
                    .action(ArgAction::SetTrue),
            )
            .arg(
                Arg::new(disable_flag)
                    .long(disable_flag)
                    .help(disable_help)
                    .action(ArgAction::SetTrue)
                    .overrides_with(enable_flag),
            );
    }
    cmd
}
