use clap::Parser;

pub const DESCRIPTION: &str = "\
{prog} - a minimalistic network manager

Checks the link state of one or more network interfaces and starts a DHCP
client on the first interface found to be active, to obtain IPv4 and IPv6
connectivity. Interfaces are listed in priority order: an active interface
earlier in the list always wins over a later one.

usage: {prog} <interface> [interface]*";

#[derive(Parser, Debug)]
#[command(
    name = "uplinkd",
    version,
    about = "Bring up the first active interface from an ordered list"
)]
pub struct Cli {
    /// Interfaces to manage, highest priority first
    #[arg(value_name = "INTERFACE")]
    pub interfaces: Vec<String>,
}

/// Description and usage text with `program` substituted as the command name.
pub fn usage(program: &str) -> String {
    DESCRIPTION.replace("{prog}", program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_is_accepted() {
        let cli = Cli::try_parse_from(["uplinkd"]).unwrap();
        assert!(cli.interfaces.is_empty());
    }

    #[test]
    fn test_interfaces_keep_order() {
        let cli = Cli::try_parse_from(["uplinkd", "wlan0", "em0", "ue0"]).unwrap();
        assert_eq!(cli.interfaces, vec!["wlan0", "em0", "ue0"]);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["uplinkd", "--poll", "5", "em0"]).is_err());
    }

    #[test]
    fn test_usage_names_program() {
        let text = usage("/usr/local/sbin/uplinkd");
        assert!(text.starts_with("/usr/local/sbin/uplinkd - a minimalistic"));
        assert!(text.ends_with("usage: /usr/local/sbin/uplinkd <interface> [interface]*"));
        assert!(!text.contains("{prog}"));
    }
}
