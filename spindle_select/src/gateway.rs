//! Spindle select command gateway.
//!
//! Handles the user M-code `M104` with exactly one of two value words:
//!
//! - `P0` / `P1`: the default spindle (slot 0) or the spindle bound to slot 1
//! - `Qn`: the spindle bound to slot `n`
//!
//! Any other M-code is passed to the handler registered before the gateway.

use bitflags::bitflags;
use spindle_common::consts::{MAX_SPINDLE_SLOTS, SPINDLE_SELECT_MCODE};
use spindle_common::spindle::registry::{SelectError, SpindleRegistry};
use spindle_common::spindle::types::SpindleId;
use thiserror::Error;
use tracing::{debug, info};

use crate::binding::BindingTable;

/// Number of accepted P word values.
const P_WORD_CHOICES: usize = 2;

bitflags! {
    /// Value words present in a parser block.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Words: u8 {
        const P = 0x01;
        const Q = 0x02;
    }
}

/// The slice of a parsed block the gateway reads and updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserBlock {
    /// User M-code number.
    pub user_mcode: u16,
    /// Words still to be consumed.
    pub words: Words,
    /// P word value, NaN when absent.
    pub p_value: f32,
    /// Q word value, NaN when absent.
    pub q_value: f32,
    /// Execute in sync with queued motion.
    pub user_mcode_sync: bool,
}

impl ParserBlock {
    /// Block carrying `mcode` and no value words.
    pub fn new(mcode: u16) -> Self {
        Self {
            user_mcode: mcode,
            words: Words::empty(),
            p_value: f32::NAN,
            q_value: f32::NAN,
            user_mcode_sync: false,
        }
    }

    /// Add a P word.
    pub fn with_p(mut self, value: f32) -> Self {
        self.words |= Words::P;
        self.p_value = value;
        self
    }

    /// Add a Q word.
    pub fn with_q(mut self, value: f32) -> Self {
        self.words |= Words::Q;
        self.q_value = value;
        self
    }
}

/// Result of an M-code support check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McodeKind {
    /// Handled by this chain.
    Normal,
    /// Not handled by anyone.
    Unsupported,
}

/// Validation failure reasons reported to the command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GatewayStatus {
    /// Required value word missing.
    #[error("Value word missing")]
    ValueWordMissing,

    /// Value word out of range, or conflicting words.
    #[error("Value out of range")]
    ValueOutOfRange,

    /// M-code not handled.
    #[error("Unsupported M-code")]
    Unhandled,
}

/// A user M-code handler that the gateway forwards to.
pub trait McodeHandler {
    /// Whether `mcode` is handled.
    fn check(&self, mcode: u16) -> McodeKind;

    /// Validate and consume the words of `block`.
    fn validate(&mut self, block: &mut ParserBlock) -> Result<(), GatewayStatus>;

    /// Execute a validated block.
    fn execute(&mut self, block: &ParserBlock);

    /// Append option report lines.
    fn report_options(&self, _out: &mut Vec<String>) {}
}

/// Spindle select M-code handler with forwarding to an earlier handler.
pub struct CommandGateway {
    mcode: u16,
    next: Option<Box<dyn McodeHandler + Send>>,
}

impl std::fmt::Debug for CommandGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandGateway")
            .field("mcode", &self.mcode)
            .field("next", &self.next.is_some())
            .finish()
    }
}

impl Default for CommandGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandGateway {
    /// Gateway for `M104` with no earlier handler.
    pub fn new() -> Self {
        Self {
            mcode: SPINDLE_SELECT_MCODE,
            next: None,
        }
    }

    /// Forward unrecognised M-codes to `handler`.
    pub fn with_next(mut self, handler: Box<dyn McodeHandler + Send>) -> Self {
        self.next = Some(handler);
        self
    }

    /// Handled M-code number.
    pub fn mcode(&self) -> u16 {
        self.mcode
    }

    /// Whether `mcode` is handled here or further down the chain.
    pub fn check(&self, mcode: u16) -> McodeKind {
        if mcode == self.mcode {
            McodeKind::Normal
        } else {
            self.next
                .as_ref()
                .map_or(McodeKind::Unsupported, |next| next.check(mcode))
        }
    }

    /// Validate a block.
    ///
    /// On success the block is flagged for motion sync and its P/Q words
    /// are consumed; the values stay for `execute`.
    pub fn validate(
        &mut self,
        block: &mut ParserBlock,
        table: &BindingTable,
    ) -> Result<(), GatewayStatus> {
        if block.user_mcode != self.mcode {
            return match self.next.as_mut() {
                Some(next) => next.validate(block),
                None => Err(GatewayStatus::Unhandled),
            };
        }

        let mut status = if block.words.contains(Words::P) {
            slot_word(block.p_value, P_WORD_CHOICES, table).map(drop)
        } else if block.words.contains(Words::Q) {
            slot_word(block.q_value, MAX_SPINDLE_SLOTS, table).map(drop)
        } else {
            Err(GatewayStatus::ValueWordMissing)
        };

        if status.is_ok() && block.words.contains(Words::P | Words::Q) {
            status = Err(GatewayStatus::ValueOutOfRange);
        }

        if let Err(e) = status {
            debug!("M{} rejected: {} (words {:?})", self.mcode, e, block.words);
            return Err(e);
        }

        block.user_mcode_sync = true;
        block.words.remove(Words::P | Words::Q);
        Ok(())
    }

    /// Execute a validated block.
    ///
    /// Activates the resolved spindle through the registry directly.
    /// Returns the activated id, `None` for forwarded blocks.
    pub fn execute(
        &mut self,
        block: &ParserBlock,
        table: &BindingTable,
        registry: &mut dyn SpindleRegistry,
    ) -> Result<Option<SpindleId>, SelectError> {
        if block.user_mcode != self.mcode {
            if let Some(next) = self.next.as_mut() {
                next.execute(block);
            }
            return Ok(None);
        }

        let Some(id) = self.resolve(block, table) else {
            debug!("M{}: nothing to select", self.mcode);
            return Ok(None);
        };

        registry.select(id)?;
        info!("M{} selected spindle {}", self.mcode, id);
        Ok(Some(id))
    }

    /// Spindle a validated block selects.
    pub fn resolve(&self, block: &ParserBlock, table: &BindingTable) -> Option<SpindleId> {
        let value = if block.p_value.is_nan() {
            block.q_value
        } else {
            block.p_value
        };
        if value.is_nan() || value < 0.0 {
            return None;
        }
        table.resolve(value as usize)
    }

    /// Append option report lines: earlier handlers first, then the
    /// default spindle name.
    pub fn report_options(
        &self,
        table: &BindingTable,
        registry: &dyn SpindleRegistry,
        out: &mut Vec<String>,
    ) {
        if let Some(next) = self.next.as_ref() {
            next.report_options(out);
        }
        if let Some(info) = registry.info(table.default_spindle()) {
            out.push(format!("[SPINDLE:{}]", info.name));
        }
    }
}

/// Check a slot-selecting word value against `limit` and the table.
fn slot_word(value: f32, limit: usize, table: &BindingTable) -> Result<usize, GatewayStatus> {
    if value.is_nan() {
        return Err(GatewayStatus::ValueWordMissing);
    }
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value >= limit as f32 {
        return Err(GatewayStatus::ValueOutOfRange);
    }
    let slot = value as usize;
    if table.resolve(slot).is_none() {
        return Err(GatewayStatus::ValueOutOfRange);
    }
    Ok(slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spindle_common::spindle::config::SelectConfig;
    use spindle_common::spindle::types::{SpindleCaps, SpindleInfo, SpindleKind, SpindleRef};

    struct FakeRegistry {
        spindles: Vec<SpindleInfo>,
        active: Option<SpindleId>,
    }

    impl FakeRegistry {
        fn new() -> Self {
            Self {
                spindles: ["PWM", "YL620A", "GS20"]
                    .iter()
                    .enumerate()
                    .map(|(i, name)| SpindleInfo {
                        id: SpindleId(i as u8),
                        ref_id: SpindleRef::None,
                        name: name.to_string(),
                        kind: SpindleKind::Basic,
                        caps: SpindleCaps::empty(),
                    })
                    .collect(),
                active: None,
            }
        }
    }

    impl SpindleRegistry for FakeRegistry {
        fn spindles(&self) -> &[SpindleInfo] {
            &self.spindles
        }

        fn select(&mut self, id: SpindleId) -> Result<(), SelectError> {
            self.active = Some(id);
            Ok(())
        }

        fn enable(&mut self, _id: SpindleId) -> Result<(), SelectError> {
            Ok(())
        }

        fn active(&self) -> Option<SpindleId> {
            self.active
        }
    }

    struct CoolantHandler {
        executed: usize,
    }

    impl McodeHandler for CoolantHandler {
        fn check(&self, mcode: u16) -> McodeKind {
            if mcode == 7 {
                McodeKind::Normal
            } else {
                McodeKind::Unsupported
            }
        }

        fn validate(&mut self, _block: &mut ParserBlock) -> Result<(), GatewayStatus> {
            Ok(())
        }

        fn execute(&mut self, _block: &ParserBlock) {
            self.executed += 1;
        }

        fn report_options(&self, out: &mut Vec<String>) {
            out.push("[PLUGIN:COOLANT]".to_string());
        }
    }

    fn setup() -> (FakeRegistry, BindingTable) {
        let reg = FakeRegistry::new();
        let mut table = BindingTable::new(SelectConfig::default());
        table.set(1, Some(SpindleId(2)), &reg).unwrap();
        (reg, table)
    }

    #[test]
    fn both_and_neither_words_rejected_distinctly() {
        let (_reg, table) = setup();
        let mut gw = CommandGateway::new();

        let mut both = ParserBlock::new(SPINDLE_SELECT_MCODE).with_p(0.0).with_q(1.0);
        assert_eq!(gw.validate(&mut both, &table), Err(GatewayStatus::ValueOutOfRange));

        let mut neither = ParserBlock::new(SPINDLE_SELECT_MCODE);
        assert_eq!(
            gw.validate(&mut neither, &table),
            Err(GatewayStatus::ValueWordMissing)
        );
    }

    #[test]
    fn p_word_range_and_binding() {
        let (_reg, table) = setup();
        let mut gw = CommandGateway::new();

        for bad in [2.0, -1.0, 0.5, f32::INFINITY] {
            let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_p(bad);
            assert_eq!(
                gw.validate(&mut block, &table),
                Err(GatewayStatus::ValueOutOfRange),
                "P{bad}"
            );
        }

        let empty = BindingTable::new(SelectConfig::default());
        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_p(1.0);
        assert_eq!(
            gw.validate(&mut block, &empty),
            Err(GatewayStatus::ValueOutOfRange)
        );
    }

    #[test]
    fn q_word_must_target_bound_slot() {
        let (_reg, table) = setup();
        let mut gw = CommandGateway::new();

        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_q(3.0);
        assert_eq!(gw.validate(&mut block, &table), Err(GatewayStatus::ValueOutOfRange));

        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_q(MAX_SPINDLE_SLOTS as f32);
        assert_eq!(gw.validate(&mut block, &table), Err(GatewayStatus::ValueOutOfRange));
    }

    #[test]
    fn valid_block_consumes_words_and_requests_sync() {
        let (mut reg, table) = setup();
        let mut gw = CommandGateway::new();

        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_q(1.0);
        gw.validate(&mut block, &table).unwrap();
        assert!(block.user_mcode_sync);
        assert!(block.words.is_empty());

        assert_eq!(gw.execute(&block, &table, &mut reg), Ok(Some(SpindleId(2))));
        assert_eq!(reg.active, Some(SpindleId(2)));

        let mut block = ParserBlock::new(SPINDLE_SELECT_MCODE).with_p(0.0);
        gw.validate(&mut block, &table).unwrap();
        assert_eq!(gw.execute(&block, &table, &mut reg), Ok(Some(SpindleId(0))));
    }

    #[test]
    fn unknown_mcode_forwards_or_is_unhandled() {
        let (mut reg, table) = setup();
        let mut bare = CommandGateway::new();
        assert_eq!(bare.check(7), McodeKind::Unsupported);
        let mut block = ParserBlock::new(7);
        assert_eq!(bare.validate(&mut block, &table), Err(GatewayStatus::Unhandled));

        let mut gw = CommandGateway::new().with_next(Box::new(CoolantHandler { executed: 0 }));
        assert_eq!(gw.check(7), McodeKind::Normal);
        assert_eq!(gw.check(SPINDLE_SELECT_MCODE), McodeKind::Normal);
        assert!(gw.validate(&mut block, &table).is_ok());
        assert_eq!(gw.execute(&block, &table, &mut reg), Ok(None));
        assert_eq!(reg.active, None);
    }

    #[test]
    fn options_report_forwards_first() {
        let (reg, table) = setup();
        let gw = CommandGateway::new().with_next(Box::new(CoolantHandler { executed: 0 }));
        let mut lines = Vec::new();
        gw.report_options(&table, &reg, &mut lines);
        assert_eq!(lines, vec!["[PLUGIN:COOLANT]", "[SPINDLE:PWM]"]);
    }
}
