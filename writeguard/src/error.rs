use derive_more::{Display, From};
use flume::{RecvError, SendError};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),

	DaemonStartFail { cause: String },
	InvalidTimeMode,

	EbpfProgNotFound,
	EbpfMapNotFound,
	InvalidEventSize,

	EventSend(String),
	EventRecv(RecvError),

	#[from]
	Ebpf(aya::EbpfError),
	#[from]
	Program(aya::programs::ProgramError),
	#[from]
	Map(aya::maps::MapError),
	#[from]
	Io(std::io::Error),
}

impl<T> From<SendError<T>> for Error {
	fn from(value: SendError<T>) -> Self {
		Self::EventSend(value.to_string())
	}
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Self::EventRecv(err)
	}
}

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
