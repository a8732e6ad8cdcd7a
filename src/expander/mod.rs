//! The expander device API. This provides the `Expander` type, which binds one physical chip, the
//! microcontroller pin carrying its interrupt output, and the buttons and rotary encoders wired to
//! its pins.

use embedded_hal::digital::v2::InputPin;
use heapless::Vec;
use log::{trace, warn};

use crate::button::{Button, ButtonEvent};
use crate::config::{
    ButtonId, ConfigError, EncoderConfig, EncoderId, ExpanderId, TriggerMode,
    DEFAULT_BUTTON_DEBOUNCE_MS, DEFAULT_MAX_BUTTONS, DEFAULT_MAX_ENCODERS,
};
use crate::error::Error;
use crate::interface::PinEventSource;
use crate::pins::{valid_pin, PinSnapshot};
use crate::queue::{EventSink, QueueClosed};
use crate::rotary::{RotaryEncoder, RotaryEvent};

pub mod line;

pub use self::line::InterruptLine;

/// Outcome of servicing one expander interrupt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Serviced {
    /// The pin the chip reported as having raised the interrupt.
    pub trigger: Option<u8>,
    /// Number of events delivered to the sink.
    pub events: usize,
}

/// What the registry and dispatcher need from an expander.
pub trait Service {
    /// Bus error of the chip driver.
    type SourceError;
    /// Read error of the interrupt line.
    type LineError;

    /// Whether the expander's interrupt line is asserted.
    fn interrupt_asserted(&self) -> Result<bool, Self::LineError>;

    /// Capture the pending interrupt, clear the chip's latch, and deliver the resulting events to
    /// `sink`. `id` is the expander's registry slot, stamped on every event.
    fn service<S: EventSink>(
        &mut self,
        id: ExpanderId,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<Serviced, Error<Self::SourceError, Self::LineError>>;
}

/// One expander chip and the devices wired to it.
///
/// `NB` and `NR` bound the number of buttons and rotary encoders. Slots are filled in order and
/// never re-bound; every pin belongs to at most one device.
///
/// ```
/// # use gpio_expander_events::interface::noop::{IdleLine, NoopSource};
/// use gpio_expander_events::{Expander, InterruptLine, TriggerMode};
///
/// let mut expander: Expander<_, _> =
///     Expander::new(NoopSource, InterruptLine::active_low(IdleLine));
/// let dial = expander.add_rotary_encoder(0, 1, false, 200).unwrap();
/// let button = expander.add_button(2, TriggerMode::Low).unwrap();
/// assert!(expander.add_button(1, TriggerMode::Low).is_err());
/// expander.init(0).unwrap();
/// # let _ = (dial, button);
/// ```
pub struct Expander<
    PS,
    IRQ,
    const NB: usize = DEFAULT_MAX_BUTTONS,
    const NR: usize = DEFAULT_MAX_ENCODERS,
> {
    source: PS,
    line: InterruptLine<IRQ>,
    buttons: Vec<Button, NB>,
    encoders: Vec<RotaryEncoder, NR>,
    button_debounce_ms: u32,
}

impl<PS, IRQ, const NB: usize, const NR: usize> Expander<PS, IRQ, NB, NR>
where
    PS: PinEventSource,
    IRQ: InputPin,
{
    /// Create a new `Expander`.
    ///
    /// Takes ownership of the chip driver, which it uses to read and configure the chip, and of
    /// the microcontroller pin connected to the chip's interrupt output.
    pub fn new(source: PS, line: InterruptLine<IRQ>) -> Self {
        Self {
            source,
            line,
            buttons: Vec::new(),
            encoders: Vec::new(),
            button_debounce_ms: DEFAULT_BUTTON_DEBOUNCE_MS,
        }
    }

    /// Set the debounce window used by [`Expander::add_button`] for buttons added afterwards.
    pub fn with_button_debounce(mut self, ms: u32) -> Self {
        self.button_debounce_ms = ms;
        self
    }

    fn pin_in_use(&self, pin: u8) -> bool {
        self.buttons.iter().any(|b| b.pin() == pin)
            || self.encoders.iter().any(|e| e.uses_pin(pin))
    }

    /// Bind a button to `pin`, using the expander's default debounce window.
    pub fn add_button(&mut self, pin: u8, mode: TriggerMode) -> Result<ButtonId, ConfigError> {
        let debounce_ms = self.button_debounce_ms;
        self.add_button_with_debounce(pin, mode, debounce_ms)
    }

    /// Bind a button to `pin` with its own debounce window.
    pub fn add_button_with_debounce(
        &mut self,
        pin: u8,
        mode: TriggerMode,
        debounce_ms: u32,
    ) -> Result<ButtonId, ConfigError> {
        let pin = valid_pin(pin)?;
        if self.pin_in_use(pin) {
            return Err(ConfigError::PinInUse(pin));
        }
        let id = ButtonId(self.buttons.len() as u8);
        self.buttons
            .push(Button::new(pin, mode, debounce_ms, 0))
            .map_err(|_| ConfigError::ButtonsFull)?;
        Ok(id)
    }

    /// Bind a rotary encoder to pins `pin_a` and `pin_b`.
    pub fn add_rotary_encoder(
        &mut self,
        pin_a: u8,
        pin_b: u8,
        full_cycle: bool,
        debounce_ms: u32,
    ) -> Result<EncoderId, ConfigError> {
        let config = EncoderConfig::new()
            .full_cycle(full_cycle)
            .debounce_ms(debounce_ms);
        self.add_rotary_encoder_with(pin_a, pin_b, config)
    }

    /// Bind a rotary encoder to pins `pin_a` and `pin_b` with a full configuration.
    pub fn add_rotary_encoder_with(
        &mut self,
        pin_a: u8,
        pin_b: u8,
        config: EncoderConfig,
    ) -> Result<EncoderId, ConfigError> {
        let pin_a = valid_pin(pin_a)?;
        let pin_b = valid_pin(pin_b)?;
        if pin_a == pin_b {
            return Err(ConfigError::SamePin(pin_a));
        }
        for &pin in &[pin_a, pin_b] {
            if self.pin_in_use(pin) {
                return Err(ConfigError::PinInUse(pin));
            }
        }
        let id = EncoderId(self.encoders.len() as u8);
        self.encoders
            .push(RotaryEncoder::new(pin_a, pin_b, config))
            .map_err(|_| ConfigError::EncodersFull)?;
        Ok(id)
    }

    /// Configure the chip for the bound devices: enable its interrupt output, make every bound pin
    /// an input with pull-up that interrupts on change, and clear anything already latched.
    /// Button debounce windows start at `now_ms`.
    ///
    /// Call this once after adding devices and before registering the expander.
    pub fn init(&mut self, now_ms: u32) -> Result<(), PS::Error> {
        self.source.enable_interrupts()?;
        for button in self.buttons.iter_mut() {
            self.source.configure_pullup(button.pin())?;
            self.source
                .configure_pin_interrupt(button.pin(), TriggerMode::Change)?;
            button.rearm(now_ms);
        }
        for encoder in self.encoders.iter() {
            let (a, b) = encoder.pins();
            for &pin in &[a, b] {
                self.source.configure_pullup(pin)?;
                self.source
                    .configure_pin_interrupt(pin, TriggerMode::Change)?;
            }
        }
        self.source.clear_interrupt_latch()
    }

    /// Read the pending interrupt from the chip and clear its latch.
    ///
    /// The triggering pin is read first, then the captured pin states, and only then is the latch
    /// cleared, so the snapshot reflects the chip as of this interrupt. If the chip reports no
    /// triggering pin, the latch is cleared anyway and `None` is returned.
    pub fn capture(&mut self) -> Result<Option<PinSnapshot>, PS::Error> {
        let trigger = self.source.read_last_interrupt_pin()?;
        if trigger.is_none() {
            warn!("expander interrupt without a triggering pin");
            self.source.clear_interrupt_latch()?;
            return Ok(None);
        }
        let pins = self.source.read_all_pins()?;
        self.source.clear_interrupt_latch()?;
        trace!("captured pins {:016b}, triggered by {:?}", pins, trigger);
        Ok(Some(PinSnapshot::new(pins, trigger)))
    }

    /// Feed `snapshot` to the devices on its triggering pin, buttons first, then encoders, each
    /// in slot order. Returns the number of events delivered.
    pub fn route<S: EventSink>(
        &mut self,
        id: ExpanderId,
        snapshot: &PinSnapshot,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<usize, QueueClosed> {
        let mut events = 0;
        for button in self.buttons.iter_mut() {
            if !snapshot.triggered_by(button.pin()) {
                continue;
            }
            if let Some(kind) = button.update(snapshot.level(button.pin()), now_ms) {
                sink.button(ButtonEvent {
                    expander: id,
                    pin: button.pin(),
                    kind,
                    at_ms: now_ms,
                })?;
                events += 1;
            }
        }
        for (slot, encoder) in self.encoders.iter_mut().enumerate() {
            let (a, b) = encoder.pins();
            if !(snapshot.triggered_by(a) || snapshot.triggered_by(b)) {
                continue;
            }
            let (level_a, level_b) = snapshot.pair(a, b);
            if let Some(direction) = encoder.update(level_a, level_b, now_ms) {
                sink.rotary(RotaryEvent {
                    expander: id,
                    encoder: EncoderId(slot as u8),
                    direction,
                    at_ms: now_ms,
                })?;
                events += 1;
            }
        }
        Ok(events)
    }

    pub fn button(&self, id: ButtonId) -> Option<&Button> {
        self.buttons.get(id.0 as usize)
    }

    pub fn encoder(&self, id: EncoderId) -> Option<&RotaryEncoder> {
        self.encoders.get(id.0 as usize)
    }

    pub fn buttons(&self) -> &[Button] {
        &self.buttons
    }

    pub fn encoders(&self) -> &[RotaryEncoder] {
        &self.encoders
    }

    pub fn max_buttons(&self) -> usize {
        NB
    }

    pub fn max_encoders(&self) -> usize {
        NR
    }

    /// Direct access to the chip driver.
    pub fn source(&mut self) -> &mut PS {
        &mut self.source
    }

    /// Release the chip driver and interrupt line, consuming the expander.
    pub fn release(self) -> (PS, InterruptLine<IRQ>) {
        (self.source, self.line)
    }
}

impl<PS, IRQ, const NB: usize, const NR: usize> Service for Expander<PS, IRQ, NB, NR>
where
    PS: PinEventSource,
    IRQ: InputPin,
{
    type SourceError = PS::Error;
    type LineError = IRQ::Error;

    fn interrupt_asserted(&self) -> Result<bool, IRQ::Error> {
        self.line.is_asserted()
    }

    fn service<S: EventSink>(
        &mut self,
        id: ExpanderId,
        now_ms: u32,
        sink: &mut S,
    ) -> Result<Serviced, Error<PS::Error, IRQ::Error>> {
        let snapshot = match self.capture().map_err(Error::from_source)? {
            Some(snapshot) => snapshot,
            None => {
                return Ok(Serviced {
                    trigger: None,
                    events: 0,
                })
            }
        };
        let events = self.route(id, &snapshot, now_ms, sink)?;
        Ok(Serviced {
            trigger: snapshot.trigger,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::ButtonEventKind;
    use crate::config::Detents;
    use crate::interface::test_spy::{BusFault, Call, Recorder, ScriptedSource, TestLine};
    use crate::queue::Event;
    use crate::rotary::Direction;

    type TestExpander = Expander<ScriptedSource, TestLine, 4, 2>;

    fn setup() -> (TestExpander, ScriptedSource, TestLine) {
        let line = TestLine::new();
        let source = ScriptedSource::new(&line);
        let ex = Expander::new(source.split(), InterruptLine::active_low(line.split()));
        (ex, source, line)
    }

    #[test]
    fn add_button_assigns_slots_in_order() {
        let (mut ex, _, _) = setup();
        assert_eq!(ex.add_button(2, TriggerMode::Change), Ok(ButtonId(0)));
        assert_eq!(ex.add_button(3, TriggerMode::Low), Ok(ButtonId(1)));
        assert_eq!(ex.button(ButtonId(1)).map(|b| b.pin()), Some(3));
        assert_eq!(ex.button(ButtonId(1)).map(|b| b.debounce_ms()), Some(20));
    }

    #[test]
    fn add_button_rejects_duplicates_range_and_overflow() {
        let (mut ex, _, _) = setup();
        assert!(ex.add_button(2, TriggerMode::Change).is_ok());
        assert_eq!(
            ex.add_button(2, TriggerMode::Low),
            Err(ConfigError::PinInUse(2))
        );
        assert_eq!(
            ex.add_button(16, TriggerMode::Low),
            Err(ConfigError::PinOutOfRange(16))
        );
        for pin in 3..6 {
            assert!(ex.add_button(pin, TriggerMode::Low).is_ok());
        }
        assert_eq!(
            ex.add_button(6, TriggerMode::Low),
            Err(ConfigError::ButtonsFull)
        );
        assert_eq!(ex.buttons().len(), 4);
    }

    #[test]
    fn add_rotary_encoder_rejects_overlaps() {
        let (mut ex, _, _) = setup();
        assert_eq!(ex.add_rotary_encoder(0, 1, false, 200), Ok(EncoderId(0)));
        assert_eq!(
            ex.add_rotary_encoder(1, 2, false, 200),
            Err(ConfigError::PinInUse(1))
        );
        assert_eq!(
            ex.add_rotary_encoder(4, 4, false, 200),
            Err(ConfigError::SamePin(4))
        );
        assert_eq!(
            ex.add_button(0, TriggerMode::Low),
            Err(ConfigError::PinInUse(0))
        );
        assert!(ex.add_button(5, TriggerMode::Low).is_ok());
        assert_eq!(
            ex.add_rotary_encoder(6, 5, false, 200),
            Err(ConfigError::PinInUse(5))
        );
        assert_eq!(ex.add_rotary_encoder(6, 7, true, 50), Ok(EncoderId(1)));
        assert_eq!(
            ex.add_rotary_encoder(8, 9, false, 200),
            Err(ConfigError::EncodersFull)
        );
        assert_eq!(
            ex.encoder(EncoderId(1)).map(|e| e.config().detents),
            Some(Detents::FULL_CYCLE)
        );
    }

    #[test]
    fn init_configures_bound_pins_and_clears_latch() {
        let (mut ex, source, _) = setup();
        ex.add_rotary_encoder(0, 1, false, 200).unwrap();
        ex.add_button(2, TriggerMode::Low).unwrap();
        ex.init(100).unwrap();
        assert_eq!(
            source.calls(),
            vec![
                Call::EnableInterrupts,
                Call::Pullup(2),
                Call::PinInterrupt(2, TriggerMode::Change),
                Call::Pullup(0),
                Call::PinInterrupt(0, TriggerMode::Change),
                Call::Pullup(1),
                Call::PinInterrupt(1, TriggerMode::Change),
                Call::ClearLatch,
            ]
        );
        assert_eq!(ex.button(ButtonId(0)).map(|b| b.last_change_ms()), Some(100));
    }

    #[test]
    fn service_reads_before_clearing() {
        let (mut ex, source, line) = setup();
        ex.add_button(2, TriggerMode::Change).unwrap();
        ex.init(0).unwrap();
        source.clear_calls();

        source.raise(0b1111_1011, 2);
        assert_eq!(ex.interrupt_asserted(), Ok(true));
        let mut sink = Recorder::default();
        let done = ex.service(ExpanderId(0), 50, &mut sink).unwrap();
        assert_eq!(
            done,
            Serviced {
                trigger: Some(2),
                events: 1
            }
        );
        assert_eq!(
            source.calls(),
            vec![Call::ReadLastInterruptPin, Call::ReadAllPins, Call::ClearLatch]
        );
        assert_eq!(line.split().is_low(), Ok(false));
        assert_eq!(
            sink.events,
            vec![Event::Button(ButtonEvent {
                expander: ExpanderId(0),
                pin: 2,
                kind: ButtonEventKind::Pressed,
                at_ms: 50,
            })]
        );
    }

    #[test]
    fn service_without_trigger_clears_latch_only() {
        let (mut ex, source, _) = setup();
        ex.add_button(2, TriggerMode::Change).unwrap();
        ex.init(0).unwrap();
        source.clear_calls();

        source.raise_without_pin();
        let mut sink = Recorder::default();
        let done = ex.service(ExpanderId(0), 50, &mut sink).unwrap();
        assert_eq!(done.trigger, None);
        assert_eq!(
            source.calls(),
            vec![Call::ReadLastInterruptPin, Call::ClearLatch]
        );
        assert_eq!(ex.interrupt_asserted(), Ok(false));
        assert!(sink.events.is_empty());
    }

    #[test]
    fn buttons_only_see_their_own_pin() {
        let (mut ex, source, _) = setup();
        ex.add_button(2, TriggerMode::Change).unwrap();
        ex.add_button(3, TriggerMode::Change).unwrap();
        ex.init(0).unwrap();

        // Both pins read low, but only pin 3 raised the interrupt.
        source.raise(0b1111_0011, 3);
        let mut sink = Recorder::default();
        ex.service(ExpanderId(1), 50, &mut sink).unwrap();
        assert_eq!(sink.button_pins(), vec![3]);
        assert_eq!(
            ex.button(ButtonId(0)).map(|b| b.stable_level()),
            Some(crate::pins::Level::High)
        );
    }

    #[test]
    fn encoder_turn_is_routed_with_slot_id() {
        let (mut ex, source, _) = setup();
        ex.add_rotary_encoder(4, 5, false, 200).unwrap();
        ex.add_rotary_encoder_with(0, 1, EncoderConfig::new().detents(Detents::none().with(0)))
            .unwrap();
        ex.init(0).unwrap();

        let mut sink = Recorder::default();
        let steps: [(u16, u8); 5] = [
            (0b0000, 0),
            (0b0001, 0),
            (0b0011, 1),
            (0b0010, 0),
            (0b0000, 1),
        ];
        for (i, &(pins, trigger)) in steps.iter().enumerate() {
            source.raise(0xFFF0 | pins, trigger);
            ex.service(ExpanderId(0), i as u32 * 3, &mut sink).unwrap();
        }
        assert_eq!(
            sink.events,
            vec![Event::Rotary(RotaryEvent {
                expander: ExpanderId(0),
                encoder: EncoderId(1),
                direction: Direction::Clockwise,
                at_ms: 12,
            })]
        );
    }

    #[test]
    fn bus_fault_is_reported() {
        let (mut ex, source, _) = setup();
        ex.add_button(2, TriggerMode::Change).unwrap();
        source.raise(0, 2);
        source.fail_reads(true);
        let mut sink = Recorder::default();
        assert_eq!(
            ex.service(ExpanderId(0), 0, &mut sink),
            Err(Error::Source(BusFault))
        );
    }

    #[test]
    fn closed_queue_is_reported() {
        let (mut ex, source, _) = setup();
        ex.add_button(2, TriggerMode::Change).unwrap();
        source.raise(0, 2);
        let mut sink = Recorder::closed();
        assert_eq!(
            ex.service(ExpanderId(0), 50, &mut sink),
            Err(Error::QueueClosed)
        );
    }
}
