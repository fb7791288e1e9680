#![no_std]

mod event;

pub use event::*;
