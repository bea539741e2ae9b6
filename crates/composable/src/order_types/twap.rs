//! Time-weighted average price orders: a total amount is sold in `n` equal
//! parts, one every `t` seconds, each part valid for `span` seconds (or until
//! the next part when `span` is zero).

use {
    crate::{
        conditional_order::{self, ConditionalOrder, ContextFactory},
        contracts::{CURRENT_BLOCK_TIMESTAMP_FACTORY, GPv2Order, TWAP_HANDLER, TwapStruct},
        error::ConstructionError,
        poll::{IsValid, OwnerContext, PollParams, PollResult},
        util::{format_epoch, random_salt},
    },
    alloy::{
        primitives::{Address, B256, Bytes, I256, U256},
        sol_types::SolValue,
    },
    anyhow::{Context, Result},
    model::order::OrderUid,
    number::serialization::DecimalI256,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::fmt::{self, Display},
    strum::{AsRefStr, Display as StrumDisplay},
};

pub const TWAP_ORDER_TYPE: &str = "twap";

/// 2^32 - 1
pub const MAX_UINT32: u64 = u32::MAX as u64;

/// One year in seconds.
pub const MAX_FREQUENCY: u64 = 365 * 24 * 60 * 60;

#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "startType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartTime {
    /// The part schedule starts when the creating transaction is mined, as
    /// recorded in the order's cabinet.
    #[default]
    AtMiningTime,
    AtEpoch {
        #[serde_as(as = "DecimalI256")]
        epoch: I256,
    },
}

#[serde_as]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "durationType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DurationOfPart {
    /// Every part is valid until the next one starts.
    #[default]
    Auto,
    LimitDuration {
        #[serde_as(as = "DecimalI256")]
        duration: I256,
    },
}

/// User facing TWAP parameters. Amounts are totals across all parts.
///
/// Integers are signed so that nonsensical negative inputs survive
/// deserialization and are reported by [`Twap::validate`].
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwapData {
    pub sell_token: Address,
    pub buy_token: Address,
    pub receiver: Address,
    #[serde_as(as = "DecimalI256")]
    pub sell_amount: I256,
    #[serde_as(as = "DecimalI256")]
    pub buy_amount: I256,
    #[serde(default)]
    pub start_time: StartTime,
    #[serde_as(as = "DecimalI256")]
    pub number_of_parts: I256,
    #[serde_as(as = "DecimalI256")]
    pub time_between_parts: I256,
    #[serde(default)]
    pub duration_of_part: DurationOfPart,
    pub app_data: B256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, StrumDisplay)]
pub enum TwapInvalid {
    InvalidSameToken,
    InvalidToken,
    InvalidSellAmount,
    InvalidMinBuyAmount,
    InvalidStartTime,
    InvalidNumParts,
    InvalidFrequency,
    InvalidSpan,
    InvalidData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Twap {
    salt: B256,
    data: TwapData,
}

/// Where the part schedule starts.
enum Start {
    Epoch(u64),
    /// The cabinet was not written yet.
    NotRecorded,
    /// The cabinet holds a value that cannot be a timestamp.
    OutOfRange(U256),
}

fn non_negative_u64(value: I256) -> Option<u64> {
    if value.is_negative() {
        return None;
    }
    u64::try_from(value.into_raw()).ok()
}

impl Twap {
    /// Creates a TWAP for `handler`, which has to be the TWAP handler. A random
    /// salt is used when none is provided.
    pub fn new(
        handler: Address,
        data: TwapData,
        salt: Option<&str>,
    ) -> Result<Self, ConstructionError> {
        if handler != TWAP_HANDLER {
            return Err(ConstructionError::InvalidHandler {
                expected: TWAP_HANDLER,
                provided: handler,
            });
        }
        let salt = match salt {
            Some(salt) => conditional_order::parse_salt(salt)?,
            None => random_salt(),
        };
        Ok(Self::with_salt(data, salt))
    }

    pub fn from_data(data: TwapData) -> Self {
        Self::with_salt(data, random_salt())
    }

    /// A zero start epoch or part duration encodes the same static input as
    /// `AtMiningTime` or `Auto`, which is how the handler reads it. The data is
    /// stored in that form.
    pub fn with_salt(mut data: TwapData, salt: B256) -> Self {
        if matches!(data.start_time, StartTime::AtEpoch { epoch } if epoch.is_zero()) {
            data.start_time = StartTime::AtMiningTime;
        }
        if matches!(
            data.duration_of_part,
            DurationOfPart::LimitDuration { duration } if duration.is_zero()
        ) {
            data.duration_of_part = DurationOfPart::Auto;
        }
        Self { salt, data }
    }

    pub fn from_params(
        params: &crate::contracts::ConditionalOrderParams,
    ) -> Result<Self, ConstructionError> {
        Self::deserialize(&conditional_order::encode_params(params))
    }

    /// Inverse of [`ConditionalOrder::serialize`].
    pub fn deserialize(serialized: &[u8]) -> Result<Self, ConstructionError> {
        let params = conditional_order::decode_params(serialized)?;
        if params.handler != TWAP_HANDLER {
            return Err(ConstructionError::HandlerMismatch {
                expected: TWAP_HANDLER,
                provided: params.handler,
            });
        }
        let static_input = TwapStruct::abi_decode(&params.staticInput)
            .map_err(|_| ConstructionError::InvalidSerializedConditionalOrder)?;
        Ok(Self::with_salt(
            Self::struct_to_data(&static_input)?,
            params.salt,
        ))
    }

    pub fn data(&self) -> &TwapData {
        &self.data
    }

    /// The handler's static input for this order.
    pub fn to_struct(&self) -> TwapStruct {
        let data = &self.data;
        let (part_sell_amount, min_part_limit) = if data.number_of_parts.is_zero() {
            (I256::ZERO, I256::ZERO)
        } else {
            (
                data.sell_amount
                    .checked_div(data.number_of_parts)
                    .unwrap_or_default(),
                data.buy_amount
                    .checked_div(data.number_of_parts)
                    .unwrap_or_default(),
            )
        };
        let t0 = match data.start_time {
            StartTime::AtMiningTime => I256::ZERO,
            StartTime::AtEpoch { epoch } => epoch,
        };
        let span = match data.duration_of_part {
            DurationOfPart::Auto => I256::ZERO,
            DurationOfPart::LimitDuration { duration } => duration,
        };
        TwapStruct {
            sellToken: data.sell_token,
            buyToken: data.buy_token,
            receiver: data.receiver,
            partSellAmount: part_sell_amount.into_raw(),
            minPartLimit: min_part_limit.into_raw(),
            t0: t0.into_raw(),
            n: data.number_of_parts.into_raw(),
            t: data.time_between_parts.into_raw(),
            span: span.into_raw(),
            appData: data.app_data,
        }
    }

    /// Total amounts are the part amounts times `n`. Static input whose totals
    /// overflow a `uint256` cannot be represented.
    pub fn struct_to_data(value: &TwapStruct) -> Result<TwapData, ConstructionError> {
        let total = |part: U256| {
            part.checked_mul(value.n)
                .map(I256::from_raw)
                .ok_or(ConstructionError::InvalidSerializedConditionalOrder)
        };
        Ok(TwapData {
            sell_token: value.sellToken,
            buy_token: value.buyToken,
            receiver: value.receiver,
            sell_amount: total(value.partSellAmount)?,
            buy_amount: total(value.minPartLimit)?,
            start_time: if value.t0.is_zero() {
                StartTime::AtMiningTime
            } else {
                StartTime::AtEpoch {
                    epoch: I256::from_raw(value.t0),
                }
            },
            number_of_parts: I256::from_raw(value.n),
            time_between_parts: I256::from_raw(value.t),
            duration_of_part: if value.span.is_zero() {
                DurationOfPart::Auto
            } else {
                DurationOfPart::LimitDuration {
                    duration: I256::from_raw(value.span),
                }
            },
            app_data: value.appData,
        })
    }

    /// Checks the parameters in the same order the handler does, reporting
    /// the first violation.
    pub fn validate(&self) -> Result<(), TwapInvalid> {
        let data = &self.data;
        if data.sell_token == data.buy_token {
            return Err(TwapInvalid::InvalidSameToken);
        }
        if data.sell_token.is_zero() || data.buy_token.is_zero() {
            return Err(TwapInvalid::InvalidToken);
        }
        if !data.sell_amount.is_positive() {
            return Err(TwapInvalid::InvalidSellAmount);
        }
        if !data.buy_amount.is_positive() {
            return Err(TwapInvalid::InvalidMinBuyAmount);
        }
        if let StartTime::AtEpoch { epoch } = data.start_time {
            if !matches!(non_negative_u64(epoch), Some(epoch) if epoch < MAX_UINT32) {
                return Err(TwapInvalid::InvalidStartTime);
            }
        }
        if !matches!(non_negative_u64(data.number_of_parts), Some(n) if n > 1 && n <= MAX_UINT32) {
            return Err(TwapInvalid::InvalidNumParts);
        }
        if !matches!(
            non_negative_u64(data.time_between_parts),
            Some(t) if t > 0 && t <= MAX_FREQUENCY
        ) {
            return Err(TwapInvalid::InvalidFrequency);
        }
        if let DurationOfPart::LimitDuration { duration } = data.duration_of_part {
            if duration > data.time_between_parts {
                return Err(TwapInvalid::InvalidSpan);
            }
            // every static input field is a uint256
            if duration.is_negative() {
                return Err(TwapInvalid::InvalidData);
            }
        }
        Ok(())
    }

    /// Number of parts and seconds between parts of a valid order.
    fn schedule(&self) -> Result<(u64, u64)> {
        let n = non_negative_u64(self.data.number_of_parts)
            .filter(|n| *n <= MAX_UINT32)
            .context("number of parts out of range")?;
        let t = non_negative_u64(self.data.time_between_parts)
            .filter(|t| *t > 0 && *t <= MAX_FREQUENCY)
            .context("time between parts out of range")?;
        Ok((n, t))
    }

    /// When the last part stops being valid for a schedule starting at
    /// `start`.
    pub fn end_timestamp(&self, start: u64) -> Result<u64> {
        let (n, t) = self.schedule()?;
        Ok(start + n * t)
    }

    async fn start_timestamp(&self, ctx: &OwnerContext<'_>) -> Result<Start> {
        if let StartTime::AtEpoch { epoch } = self.data.start_time {
            let epoch = non_negative_u64(epoch).context("start epoch out of range")?;
            return Ok(Start::Epoch(epoch));
        }
        let cabinet = U256::from_be_bytes(self.cabinet(ctx).await?.0);
        if cabinet.is_zero() {
            return Ok(Start::NotRecorded);
        }
        match u64::try_from(cabinet) {
            Ok(epoch) if epoch <= MAX_UINT32 => Ok(Start::Epoch(epoch)),
            _ => Ok(Start::OutOfRange(cabinet)),
        }
    }

    /// Resolves the start of the schedule and the current block timestamp, or
    /// the poll result to give up with.
    async fn resolve_window(
        &self,
        params: &PollParams<'_>,
    ) -> Result<Result<(u64, u64), PollResult>> {
        let start = match self.start_timestamp(&params.owner_context()).await? {
            Start::Epoch(epoch) => Some(epoch),
            Start::NotRecorded => None,
            Start::OutOfRange(value) => {
                return Ok(Err(PollResult::DontTryAgain {
                    reason: format!("Cabinet epoch out of range: {value}"),
                }));
            }
        };
        let now = params.block_info().await?.block_timestamp;
        Ok(Ok((start.unwrap_or(now), now)))
    }
}

#[async_trait::async_trait]
impl ConditionalOrder for Twap {
    fn handler(&self) -> Address {
        TWAP_HANDLER
    }

    fn salt(&self) -> B256 {
        self.salt
    }

    fn order_type(&self) -> &'static str {
        TWAP_ORDER_TYPE
    }

    fn encode_static_input(&self) -> Bytes {
        self.to_struct().abi_encode().into()
    }

    fn is_valid(&self) -> IsValid {
        match self.validate() {
            Ok(()) => IsValid::Valid,
            Err(reason) => IsValid::Invalid {
                reason: reason.to_string(),
            },
        }
    }

    fn context(&self) -> Option<ContextFactory> {
        match self.data.start_time {
            StartTime::AtMiningTime => Some(ContextFactory {
                address: CURRENT_BLOCK_TIMESTAMP_FACTORY,
                factory_args: Bytes::new(),
            }),
            StartTime::AtEpoch { .. } => None,
        }
    }

    async fn poll_validate(&self, params: &PollParams<'_>) -> Result<Option<PollResult>> {
        let (start, now) = match self.resolve_window(params).await? {
            Ok(window) => window,
            Err(result) => return Ok(Some(result)),
        };

        if now < start {
            return Ok(Some(PollResult::TryAtEpoch {
                epoch: start,
                reason: format!(
                    "TWAP hasn't started yet. Starts at {start} ({})",
                    format_epoch(start)
                ),
            }));
        }

        let end = self.end_timestamp(start)?;
        if now >= end {
            return Ok(Some(PollResult::DontTryAgain {
                reason: format!(
                    "TWAP has expired. Expired at {end} ({})",
                    format_epoch(end)
                ),
            }));
        }

        Ok(None)
    }

    async fn handle_poll_failed_already_present(
        &self,
        _uid: &OrderUid,
        _order: &GPv2Order::Data,
        params: &PollParams<'_>,
    ) -> Result<Option<PollResult>> {
        let (start, now) = match self.resolve_window(params).await? {
            Ok(window) => window,
            Err(result) => return Ok(Some(result)),
        };

        if now < start {
            return Ok(Some(PollResult::UnexpectedError {
                reason: Some(format!(
                    "TWAP part hasn't started. First TWAP part start at {start} ({})",
                    format_epoch(start)
                )),
                error: None,
            }));
        }

        let end = self.end_timestamp(start)?;
        if now >= end {
            return Ok(Some(PollResult::UnexpectedError {
                reason: Some(format!(
                    "TWAP is expired. Expired at {end} ({})",
                    format_epoch(end)
                )),
                error: None,
            }));
        }

        let (n, t) = self.schedule()?;
        let current_part = (now - start) / t;
        let part = current_part + 1;
        if part == n {
            return Ok(Some(PollResult::DontTryAgain {
                reason: format!(
                    "Current active TWAP part ({part}/{n}) is already in the Order Book. This was \
                     the last TWAP part, no more orders need to be placed"
                ),
            }));
        }

        let next_part_start = start + part * t;
        Ok(Some(PollResult::TryAtEpoch {
            epoch: next_part_start,
            reason: format!(
                "Current active TWAP part ({part}/{n}) is already in the Order Book. TWAP part {} \
                 doesn't start until {next_part_start} ({})",
                part + 1,
                format_epoch(next_part_start)
            ),
        }))
    }
}

/// Flat JSON view of the order used by [`Display`].
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    sell_amount: String,
    sell_token: String,
    buy_amount: String,
    buy_token: String,
    number_of_parts: String,
    start_time: serde_json::Value,
    time_between_parts: serde_json::Value,
    duration_of_part: serde_json::Value,
    receiver: String,
    app_data: B256,
}

fn json_number(value: I256) -> serde_json::Value {
    match i64::try_from(value) {
        Ok(value) => value.into(),
        Err(_) => value.to_string().into(),
    }
}

impl Display for Twap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = &self.data;
        let summary = Summary {
            sell_amount: data.sell_amount.to_string(),
            sell_token: data.sell_token.to_checksum(None),
            buy_amount: data.buy_amount.to_string(),
            buy_token: data.buy_token.to_checksum(None),
            number_of_parts: data.number_of_parts.to_string(),
            start_time: match data.start_time {
                StartTime::AtMiningTime => "AT_MINING_TIME".into(),
                StartTime::AtEpoch { epoch } => json_number(epoch),
            },
            time_between_parts: json_number(data.time_between_parts),
            duration_of_part: match data.duration_of_part {
                DurationOfPart::Auto => "AUTO".into(),
                DurationOfPart::LimitDuration { duration } => json_number(duration),
            },
            receiver: data.receiver.to_checksum(None),
            app_data: data.app_data,
        };
        let json = serde_json::to_string(&summary).map_err(|_| fmt::Error)?;
        write!(f, "{} ({}): {json}", self.order_type(), self.id())
    }
}
