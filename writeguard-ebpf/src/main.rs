#![no_std]
#![no_main]

use aya_ebpf::{
	helpers::{bpf_get_current_comm, bpf_get_current_pid_tgid},
	macros::{map, tracepoint},
	maps::RingBuf,
	programs::TracePointContext,
};
use aya_log_ebpf::error;
use writeguard_common::{WriteEvent, COMM_LEN, FILENAME_LEN};

#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(16 * 1024 * 1024, 0);

// Byte offset of the `count` field (the syscall's third argument) in the
// `syscalls/sys_enter_write` tracepoint record: 8 bytes of common fields,
// __syscall_nr + padding at 8, fd at 16, buf at 24, count at 32.
const WRITE_COUNT_OFFSET: usize = 32;

#[tracepoint]
pub fn sys_enter_write(ctx: TracePointContext) -> u32 {
	match try_sys_enter_write(ctx) {
		Ok(ret) => ret,
		Err(ret) => ret,
	}
}

fn try_sys_enter_write(ctx: TracePointContext) -> Result<u32, u32> {
	// Reservation succeeds now or not at all. A saturated ring drops the
	// event silently; the instrumented syscall proceeds untouched either way.
	let Some(mut entry) = EVENTS.reserve::<WriteEvent>(0) else {
		return Ok(0);
	};

	let write_len: u64 = match unsafe { ctx.read_at(WRITE_COUNT_OFFSET) } {
		Ok(len) => len,
		Err(_) => {
			entry.discard(0);
			error!(&ctx, "failed to read write count from tracepoint args");
			return Err(1);
		}
	};

	// uid, filename and entropy_score stay zeroed until their population is
	// implemented; the consumer relies on them never being garbage.
	entry.write(WriteEvent {
		pid: (bpf_get_current_pid_tgid() >> 32) as u32,
		uid: 0,
		comm: bpf_get_current_comm().unwrap_or([0u8; COMM_LEN]),
		filename: [0u8; FILENAME_LEN],
		write_len,
		entropy_score: 0,
	});
	entry.submit(0);

	Ok(0)
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
	loop {}
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual BSD/GPL\0";
