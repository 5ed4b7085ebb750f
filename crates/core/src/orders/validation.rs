//! Order input validation.
//!
//! Turns raw storefront JSON into a [`NewOrder`] or a [`ValidationFailure`]. All checks
//! run before anything is persisted, so a failure never leaves a partial order behind.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::order::{NewOrder, OrderLineItem, DEFAULT_COLOR, DEFAULT_SIZE};
use crate::domain::product::ProductId;

const CUSTOMER_EMAIL_KEYS: &[&str] = &["customerEmail", "user_email", "customer_email"];
const CUSTOMER_NAME_KEYS: &[&str] = &["customerName", "user_full_name", "customer_name"];
const SHIPPING_ADDRESS_KEYS: &[&str] = &["shippingAddress", "shipping_address"];
const PHONE_KEYS: &[&str] = &["phone"];
const PRODUCT_ID_KEYS: &[&str] = &["productId", "product_id"];

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ItemDefect {
    #[error("item must be an object")]
    NotAnObject,
    #[error("productId is required")]
    MissingProductId,
    #[error("name is required")]
    MissingName,
    #[error("price must be numeric")]
    NonNumericPrice,
    #[error("quantity must be numeric")]
    NonNumericQuantity,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("quantity must not be negative")]
    NegativeQuantity,
    #[error("quantity must be a whole number")]
    FractionalQuantity,
    #[error("quantity is too large")]
    QuantityOutOfRange,
    #[error("price times quantity is too large")]
    AmountOutOfRange,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("request body must be a JSON object")]
    MalformedPayload,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("order must contain at least one item")]
    EmptyOrder,
    #[error("invalid item at position {index}: {defect}")]
    InvalidItem { index: usize, defect: ItemDefect },
    #[error("order total is too large")]
    TotalOutOfRange,
}

pub fn validate_order_input(input: &Value) -> Result<NewOrder, ValidationFailure> {
    let fields = input.as_object().ok_or(ValidationFailure::MalformedPayload)?;

    let customer_email = required_text(fields, "customerEmail", CUSTOMER_EMAIL_KEYS)?;
    let customer_name = required_text(fields, "customerName", CUSTOMER_NAME_KEYS)?;
    let shipping_address = required_text(fields, "shippingAddress", SHIPPING_ADDRESS_KEYS)?;
    let phone = required_text(fields, "phone", PHONE_KEYS)?;

    let raw_items = match fields.get("items") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => return Err(ValidationFailure::EmptyOrder),
    };

    let items = raw_items
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize_item(raw).map_err(|defect| ValidationFailure::InvalidItem { index, defect })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let order = NewOrder { customer_email, customer_name, shipping_address, phone, items };
    if order.total_amount().is_none() {
        return Err(ValidationFailure::TotalOutOfRange);
    }
    Ok(order)
}

pub fn normalize_item(raw: &Value) -> Result<OrderLineItem, ItemDefect> {
    let fields = raw.as_object().ok_or(ItemDefect::NotAnObject)?;

    let product_id = first_text(fields, PRODUCT_ID_KEYS).ok_or(ItemDefect::MissingProductId)?;
    let name = first_text(fields, &["name"]).ok_or(ItemDefect::MissingName)?;

    let price = fields.get("price").and_then(parse_number).ok_or(ItemDefect::NonNumericPrice)?;
    let quantity =
        fields.get("quantity").and_then(parse_number).ok_or(ItemDefect::NonNumericQuantity)?;

    let item = OrderLineItem {
        product_id: ProductId(product_id),
        name,
        size: descriptor_or(fields.get("size"), DEFAULT_SIZE),
        color: descriptor_or(fields.get("color"), DEFAULT_COLOR),
        quantity: coerce_quantity(quantity)?,
        price: coerce_price(price)?,
    };
    item.subtotal().ok_or(ItemDefect::AmountOutOfRange)?;
    Ok(item)
}

/// Accepts JSON numbers and numeric strings. `null`, booleans and blank strings are not
/// numbers.
pub fn parse_number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => parse_decimal(&number.to_string()),
        Value::String(text) => parse_decimal(text.trim()),
        _ => None,
    }
}

/// A zero quantity falls back to one.
pub fn coerce_quantity(value: Decimal) -> Result<u32, ItemDefect> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ItemDefect::NegativeQuantity);
    }
    if !value.fract().is_zero() {
        return Err(ItemDefect::FractionalQuantity);
    }
    if value.is_zero() {
        return Ok(1);
    }
    u32::try_from(value.trunc().mantissa() / 10i128.pow(value.scale()))
        .map_err(|_| ItemDefect::QuantityOutOfRange)
}

pub fn coerce_price(value: Decimal) -> Result<Decimal, ItemDefect> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ItemDefect::NegativePrice);
    }
    Ok(value.normalize())
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text).or_else(|_| Decimal::from_scientific(text)).ok()
}

fn required_text(
    fields: &Map<String, Value>,
    canonical: &'static str,
    keys: &[&str],
) -> Result<String, ValidationFailure> {
    first_text(fields, keys).ok_or(ValidationFailure::MissingField(canonical))
}

fn first_text(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| fields.get(*key).and_then(text_value))
}

fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn descriptor_or(value: Option<&Value>, fallback: &str) -> String {
    value.and_then(text_value).unwrap_or_else(|| fallback.to_string())
}
