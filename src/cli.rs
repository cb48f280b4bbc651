use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about = "Convert proxy share links into engine config files", long_about = None)]
pub struct Args {
    #[arg(
        help = "Share link (vmess://, vless://, trojan://, ss://, socks://)",
        required_unless_present = "input",
        conflicts_with = "input"
    )]
    pub link: Option<String>,

    #[arg(short, long, help = "Read links from a file, one per line")]
    pub input: Option<String>,

    #[arg(
        short = 'n',
        long,
        default_value_t = 0,
        requires = "input",
        help = "Which successfully parsed link of the input file to use"
    )]
    pub index: usize,

    #[arg(short, long, help = "Settings file (TOML)")]
    pub settings: Option<String>,

    #[arg(short, long, help = "Config output path, stdout when omitted")]
    pub output: Option<String>,

    #[arg(long, default_value_t = 2, help = "Indent width, 0 for compact JSON")]
    pub indent: usize,

    #[arg(long, help = "Only emit the proxy outbound")]
    pub outbound_only: bool,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,
}
