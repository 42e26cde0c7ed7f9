//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.

use crate::app::commands::IrrigationCommand;
use crate::error::{Rejection, StoreError};
use crate::fsm::{StateId, Transition};
use crate::sensors::filter::Channel;
use crate::sensors::NutrientFlags;

/// Structured events emitted by the control service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial irrigation state).
    Started(StateId),

    /// A debounced nutrient flag changed.
    NutrientChanged(NutrientFlags),

    /// A filtered analog reading moved past its change threshold.
    AnalogChanged { channel: Channel, value: f32 },

    /// The irrigation state machine moved.
    IrrigationTransition(Transition),

    /// An operator command was refused; nothing changed.
    CommandRejected {
        command: IrrigationCommand,
        reason: Rejection,
    },

    /// A store publish was skipped; the previous value stays visible.
    PublishDropped {
        region: StoreRegion,
        reason: StoreError,
    },

    /// The acquisition loop woke up later than a whole period.
    CycleOverrun { missed: u32 },
}

/// The disjoint store regions, one per producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRegion {
    Sensors,
    Irrigation,
    Health,
}
