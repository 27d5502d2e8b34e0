//! Order placement input: raw arguments as they arrive from a façade, and
//! the validated request that is actually sent upstream.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a string-coded enum with `FromStr` (case-insensitive), `Display`
/// and serde support using the upstream codes.
macro_rules! coded_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal, $expected:literal { $($variant:ident => $code:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $code)] $variant),+
        }

        impl $name {
            pub fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(Error::invalid_value(
                        $field,
                        format!("must be one of {}", $expected),
                        s,
                    )),
                }
            }
        }
    };
}

coded_enum!(
    TransactionType, "transaction_type", "BUY, SELL" {
        Buy => "BUY",
        Sell => "SELL",
    }
);

coded_enum!(
    /// Product code: delivery, intraday, margin, cover order, bracket order.
    Product, "product", "D, I, M, CO, BO" {
        Delivery => "D",
        Intraday => "I",
        Margin => "M",
        CoverOrder => "CO",
        BracketOrder => "BO",
    }
);

coded_enum!(
    OrderType, "order_type", "MARKET, LIMIT, SL, SL-M" {
        Market => "MARKET",
        Limit => "LIMIT",
        StopLoss => "SL",
        StopLossMarket => "SL-M",
    }
);

coded_enum!(
    Validity, "validity", "DAY, IOC" {
        Day => "DAY",
        Ioc => "IOC",
    }
);

/// Funds/margin segment filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    #[serde(rename = "SEC")]
    Equity,
    #[serde(rename = "COM")]
    Commodity,
}

impl Segment {
    pub fn code(self) -> &'static str {
        match self {
            Self::Equity => "SEC",
            Self::Commodity => "COM",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Segment {
    type Err = Error;

    /// Only the exact upstream codes are accepted.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SEC" => Ok(Self::Equity),
            "COM" => Ok(Self::Commodity),
            _ => Err(Error::invalid_value(
                "segment",
                "must be SEC (equity) or COM (commodity)",
                s,
            )),
        }
    }
}

/// Parse an optional segment, treating an empty string as "no filter".
pub fn parse_segment(raw: Option<&str>) -> Result<Option<Segment>> {
    match raw {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

/// Order arguments before validation. Every field is optional so that a
/// missing or mistyped value surfaces as a validation error naming the field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceOrderArgs {
    pub instrument_token: Option<String>,
    pub quantity: Option<i64>,
    pub transaction_type: Option<String>,
    pub product: Option<String>,
    pub order_type: Option<String>,
    pub validity: Option<String>,
    pub price: Option<f64>,
    pub trigger_price: Option<f64>,
    pub disclosed_quantity: Option<i64>,
    pub is_amo: Option<bool>,
    pub slice: Option<bool>,
    pub tag: Option<String>,
}

impl PlaceOrderArgs {
    /// Read arguments from a JSON object. Type mismatches are validation
    /// errors, not parse errors.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Self::deserialize(value).map_err(|e| Error::validation("order", e.to_string()))
    }

    pub fn validate(self) -> Result<PlaceOrderRequest> {
        let instrument_token = self
            .instrument_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::validation("instrument_token", "Instrument token is required"))?;

        let quantity = match self.quantity {
            None => return Err(Error::validation("quantity", "Quantity is required")),
            Some(q) if q <= 0 => {
                return Err(Error::invalid_value(
                    "quantity",
                    "Quantity must be greater than 0",
                    q,
                ));
            }
            Some(q) => u32::try_from(q).map_err(|_| {
                Error::invalid_value("quantity", "Quantity is too large", q)
            })?,
        };

        let transaction_type: TransactionType = self
            .transaction_type
            .as_deref()
            .ok_or_else(|| Error::validation("transaction_type", "Transaction type is required"))?
            .parse()?;

        let product = parse_or(self.product.as_deref(), Product::Delivery)?;
        let order_type = parse_or(self.order_type.as_deref(), OrderType::Market)?;
        let validity = parse_or(self.validity.as_deref(), Validity::Day)?;

        let price = non_negative("price", self.price.unwrap_or(0.0))?;
        let trigger_price = non_negative("trigger_price", self.trigger_price.unwrap_or(0.0))?;
        let disclosed_quantity = match self.disclosed_quantity.unwrap_or(0) {
            q if q < 0 => {
                return Err(Error::invalid_value(
                    "disclosed_quantity",
                    "Disclosed quantity cannot be negative",
                    q,
                ));
            }
            q => u32::try_from(q).map_err(|_| {
                Error::invalid_value("disclosed_quantity", "Disclosed quantity is too large", q)
            })?,
        };

        Ok(PlaceOrderRequest {
            instrument_token,
            quantity,
            transaction_type,
            product,
            order_type,
            validity,
            price,
            trigger_price,
            disclosed_quantity,
            is_amo: self.is_amo.unwrap_or(false),
            slice: self.slice.unwrap_or(false),
            tag: self.tag.filter(|t| !t.is_empty()),
        })
    }
}

fn parse_or<T: FromStr<Err = Error>>(raw: Option<&str>, default: T) -> Result<T> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(s) => s.parse(),
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::invalid_value(field, format!("{field} must be a non-negative number"), value))
    }
}

/// Validated order, serialized as the upstream request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOrderRequest {
    pub instrument_token: String,
    pub quantity: u32,
    pub transaction_type: TransactionType,
    pub product: Product,
    pub order_type: OrderType,
    pub validity: Validity,
    pub price: f64,
    pub trigger_price: f64,
    pub disclosed_quantity: u32,
    pub is_amo: bool,
    pub slice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market_buy() -> PlaceOrderArgs {
        PlaceOrderArgs {
            instrument_token: Some("NSE_EQ|INE848E01016".into()),
            quantity: Some(1),
            transaction_type: Some("BUY".into()),
            ..Default::default()
        }
    }

    fn rejected_field(err: Error) -> String {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let req = market_buy().validate().unwrap();
        assert_eq!(req.product, Product::Delivery);
        assert_eq!(req.order_type, OrderType::Market);
        assert_eq!(req.validity, Validity::Day);
        assert_eq!(req.price, 0.0);
        assert!(!req.is_amo);
        assert!(!req.slice);
    }

    #[test]
    fn body_uses_upstream_codes() {
        let mut args = market_buy();
        args.order_type = Some("sl-m".into());
        args.trigger_price = Some(101.5);
        args.tag = Some("swing".into());
        let body = serde_json::to_value(args.validate().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "instrument_token": "NSE_EQ|INE848E01016",
                "quantity": 1,
                "transaction_type": "BUY",
                "product": "D",
                "order_type": "SL-M",
                "validity": "DAY",
                "price": 0.0,
                "trigger_price": 101.5,
                "disclosed_quantity": 0,
                "is_amo": false,
                "slice": false,
                "tag": "swing"
            })
        );
    }

    #[test]
    fn transaction_type_is_case_insensitive() {
        let mut args = market_buy();
        args.transaction_type = Some("sell".into());
        assert_eq!(args.validate().unwrap().transaction_type, TransactionType::Sell);
    }

    #[test]
    fn rejects_unknown_transaction_type() {
        let mut args = market_buy();
        args.transaction_type = Some("HOLD".into());
        let err = args.validate().unwrap_err();
        match err {
            Error::Validation {
                field,
                invalid_value,
                ..
            } => {
                assert_eq!(field, "transaction_type");
                assert_eq!(invalid_value, Some(json!("HOLD")));
            }
            other => panic!("unexpected {other}"),
        }
    }

    #[test]
    fn rejects_missing_required_fields() {
        let mut args = market_buy();
        args.instrument_token = Some("  ".into());
        assert_eq!(rejected_field(args.validate().unwrap_err()), "instrument_token");

        let mut args = market_buy();
        args.quantity = Some(0);
        assert_eq!(rejected_field(args.validate().unwrap_err()), "quantity");

        let mut args = market_buy();
        args.transaction_type = None;
        assert_eq!(rejected_field(args.validate().unwrap_err()), "transaction_type");
    }

    #[test]
    fn rejects_negative_price_and_bad_product() {
        let mut args = market_buy();
        args.price = Some(-1.0);
        assert_eq!(rejected_field(args.validate().unwrap_err()), "price");

        let mut args = market_buy();
        args.product = Some("X".into());
        assert_eq!(rejected_field(args.validate().unwrap_err()), "product");
    }

    #[test]
    fn mistyped_json_is_validation_error() {
        let err = PlaceOrderArgs::from_json(&json!({"quantity": "ten"})).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn segment_accepts_only_upstream_codes() {
        assert_eq!(parse_segment(Some("SEC")).unwrap(), Some(Segment::Equity));
        assert_eq!(parse_segment(Some("COM")).unwrap(), Some(Segment::Commodity));
        assert_eq!(parse_segment(None).unwrap(), None);
        assert_eq!(parse_segment(Some("")).unwrap(), None);
        assert!(parse_segment(Some("EQUITY")).unwrap_err().is_validation());
        assert!(parse_segment(Some("sec")).is_err());
    }
}
