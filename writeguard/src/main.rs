mod cli;
mod error;
mod trx;
mod worker;

use crate::{
	cli::args::{Cli, RunMode},
	trx::{new_exit_pair, new_trx_pair, ExitTx},
	worker::{RingBufWorker, SinkWorker},
};

pub use self::error::{Error, Result};
use aya::{
	maps::{MapData, RingBuf},
	programs::TracePoint,
	Ebpf,
};
use clap::Parser;
use daemonize::Daemonize;
use std::{fs::File, path::Path, time::Duration};
use tokio::io::unix::AsyncFd;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::EnvFilter;

pub fn daemonize_process(log_path: &str) -> Result<()> {
	let log_file = File::create(Path::new(log_path))?;

	let daemonize = Daemonize::new()
		.working_directory("/")
		.umask(0o027)
		.stdout(log_file.try_clone()?)
		.stderr(log_file);

	daemonize
		.start()
		.map_err(|err| Error::DaemonStartFail { cause: err.to_string() })?;

	Ok(())
}

// The rolling appender joins its prefix onto the log directory; an absolute
// prefix would override the directory entirely, so only the file name of the
// configured path is used.
fn rolling_log_prefix(log_path: &str) -> String {
	Path::new(log_path)
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_else(|| "writeguard.log".to_string())
}

fn init_tracing_file(log_path: &str) -> WorkerGuard {
	let file_appender = rolling::daily("/var/log/writeguard", rolling_log_prefix(log_path));
	let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

	tracing_subscriber::fmt()
		.with_writer(non_blocking_writer)
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();

	guard
}

fn init_tracing_stdout() {
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::from_default_env())
		.init();
}

fn spawn_exit_triggers(exit_tx: ExitTx, run_time: Option<Duration>) {
	let sigint_tx = exit_tx.clone();
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			let _ = sigint_tx.send().await;
		}
	});

	// A daemonized process has no terminal for SIGINT; SIGTERM is how it
	// gets stopped.
	let sigterm_tx = exit_tx.clone();
	tokio::spawn(async move {
		if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
			sigterm.recv().await;
			let _ = sigterm_tx.send().await;
		}
	});

	if let Some(run_time) = run_time {
		tokio::spawn(async move {
			tokio::time::sleep(run_time).await;
			let _ = exit_tx.send().await;
		});
	}
}

fn main() -> Result<()> {
	let args = Cli::parse();

	if args.time.is_some() && args.mode != RunMode::Daemon {
		return Err(Error::InvalidTimeMode);
	}

	// Fork before tracing init and before the runtime is built: neither the
	// appender's writer thread nor tokio's worker threads survive fork().
	if let RunMode::Daemon = args.mode {
		daemonize_process(&args.log_file)?;
	}

	let _tracing_guard = match args.mode {
		RunMode::Foreground => {
			init_tracing_stdout();
			None
		}
		RunMode::Daemon => Some(init_tracing_file(&args.log_file)),
	};

	let runtime = tokio::runtime::Runtime::new()?;
	runtime.block_on(run_agent(args.time.map(Duration::from_secs)))
}

async fn run_agent(run_time: Option<Duration>) -> Result<()> {
	// Bump the memlock rlimit. This is needed for older kernels that don't use the
	// new memcg based accounting, see https://lwn.net/Articles/837122/
	let rlim = libc::rlimit {
		rlim_cur: libc::RLIM_INFINITY,
		rlim_max: libc::RLIM_INFINITY,
	};
	let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
	if ret != 0 {
		debug!("remove limit on locked memory failed, ret is: {ret}");
	}

	let mut ebpf = aya::Ebpf::load(aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/writeguard")))?;
	if let Err(e) = aya_log::EbpfLogger::init(&mut ebpf) {
		// This can happen if you remove all log statements from your eBPF program.
		warn!("failed to initialize eBPF logger: {e}");
	}

	let ringbuf_fd = load_hooks(&mut ebpf)?;
	info!("write tracepoint attached, draining events");

	let (evt_tx, evt_rx) = new_trx_pair();
	let (exit_tx, exit_rx) = new_exit_pair();

	RingBufWorker::start(ringbuf_fd, evt_tx).await?;
	SinkWorker::start(evt_rx).await?;

	spawn_exit_triggers(exit_tx, run_time);

	// Keep `ebpf` alive until exit; dropping it detaches the tracepoint.
	let _ = exit_rx.recv().await;

	Ok(())
}

pub fn load_hooks(ebpf: &mut Ebpf) -> Result<AsyncFd<RingBuf<MapData>>> {
	let tp_sys_enter_write: &mut TracePoint = ebpf
		.program_mut("sys_enter_write")
		.ok_or(Error::EbpfProgNotFound)?
		.try_into()?;
	tp_sys_enter_write.load()?;
	tp_sys_enter_write.attach("syscalls", "sys_enter_write")?;

	let ring_buf = RingBuf::try_from(ebpf.take_map("EVENTS").ok_or(Error::EbpfMapNotFound)?)?;
	let fd = AsyncFd::new(ring_buf)?;
	Ok(fd)
}
