use gnss_rs::sv::SV;

/// Messages a [`crate::channel::Channel`] raises to the receiver's control bus.
#[derive(Clone, Copy, Debug)]
pub enum ControlMessage {
    LossOfLock { sv: SV, cn0_db_hz: f64 },
    CarrierLock { sv: SV },
}

pub type ControlSender = std::sync::mpsc::SyncSender<ControlMessage>;
pub type ControlReceiver = std::sync::mpsc::Receiver<ControlMessage>;

/// Bounded mpsc fan-in, one sender clone per channel, single consumer on the receiver loop.
pub fn control_bus(capacity: usize) -> (ControlSender, ControlReceiver) {
    std::sync::mpsc::sync_channel(capacity)
}
