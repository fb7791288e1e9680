use zerocopy_derive::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Fixed width of the kernel task command name, NUL terminator included.
pub const COMM_LEN: usize = 16;

/// Fixed width of the (reserved) target path buffer.
pub const FILENAME_LEN: usize = 256;

/// One record per intercepted `write(2)` entry, copied byte-for-byte out of
/// the kernel ring buffer. `#[repr(C)]`, no internal padding; the field order
/// and sizes are the wire contract with the consumer and must not change
/// without versioning the schema.
///
/// `uid`, `filename` and `entropy_score` are declared but not filled in by
/// the current hook; they always read as zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct WriteEvent {
	pub pid: u32,
	pub uid: u32,
	pub comm: [u8; COMM_LEN],
	pub filename: [u8; FILENAME_LEN],
	pub write_len: u64,
	pub entropy_score: u64,
}

/// Pinned record size. Both sides of the kernel/userspace boundary must
/// agree on this exact value.
pub const WRITE_EVENT_SIZE: usize = 296;

const _: () = assert!(core::mem::size_of::<WriteEvent>() == WRITE_EVENT_SIZE);
const _: () = assert!(core::mem::align_of::<WriteEvent>() == 8);

#[cfg(feature = "user")]
unsafe impl aya::Pod for WriteEvent {}

#[cfg(test)]
mod tests {
	use super::*;
	use core::mem::offset_of;
	use zerocopy::FromZeros;

	#[test]
	fn layout_is_pinned() {
		assert_eq!(offset_of!(WriteEvent, pid), 0);
		assert_eq!(offset_of!(WriteEvent, uid), 4);
		assert_eq!(offset_of!(WriteEvent, comm), 8);
		assert_eq!(offset_of!(WriteEvent, filename), 24);
		assert_eq!(offset_of!(WriteEvent, write_len), 280);
		assert_eq!(offset_of!(WriteEvent, entropy_score), 288);
		assert_eq!(core::mem::size_of::<WriteEvent>(), WRITE_EVENT_SIZE);
	}

	#[test]
	fn zeroed_record_has_default_extension_fields() {
		let evt = WriteEvent::new_zeroed();
		assert_eq!(evt.uid, 0);
		assert_eq!(evt.entropy_score, 0);
		assert!(evt.filename.iter().all(|&b| b == 0));
	}
}
