use byte_unit::{Byte, UnitType};
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Default)]
pub struct Counters {
    pub delivered: AtomicU64,
    pub failed: AtomicU64,
    pub bytes_in: AtomicU64,
    pub bytes_out: AtomicU64,
}

impl Counters {
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn report(&self) {
        let delivered = self.delivered.load(Ordering::Relaxed);
        let failed = self.failed();
        let bytes_in = self.bytes_in.load(Ordering::Relaxed);
        let bytes_out = self.bytes_out.load(Ordering::Relaxed);
        info!(
            "archived {delivered} files ({} in, {} out)",
            pretty_size(bytes_in),
            pretty_size(bytes_out)
        );
        if failed > 0 {
            info!("failed to archive {failed} files");
        }
    }
}

pub fn pretty_size(size: u64) -> impl Display {
    Byte::from_u64(size).get_appropriate_unit(UnitType::Binary)
}
