use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "writeguard")]
pub struct Cli {
	#[arg(long, value_enum, default_value = "foreground")]
	pub mode: RunMode,

	#[arg(long, default_value = "/var/log/writeguard.log")]
	pub log_file: String,

	/// Stop after this many seconds (daemon mode only).
	#[arg(long)]
	pub time: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
	Foreground,
	Daemon,
}
