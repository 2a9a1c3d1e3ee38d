// order_intake/src/models/shipping.rs

/// Shipping methods with a dedicated order-code letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShippingMethod {
  Pickup,
  LocalDelivery,
  Usps,
  Ups,
  Fedex,
}

impl ShippingMethod {
  pub fn parse(raw: &str) -> Option<Self> {
    let normalized: String = raw
      .trim()
      .to_lowercase()
      .chars()
      .filter(|c| c.is_ascii_alphanumeric())
      .collect();
    match normalized.as_str() {
      "pickup" | "storepickup" | "instorepickup" => Some(ShippingMethod::Pickup),
      "local" | "localdelivery" | "delivery" => Some(ShippingMethod::LocalDelivery),
      "usps" => Some(ShippingMethod::Usps),
      "ups" => Some(ShippingMethod::Ups),
      "fedex" => Some(ShippingMethod::Fedex),
      _ => None,
    }
  }

  /// Rate-table key for this method.
  pub fn key(&self) -> &'static str {
    match self {
      ShippingMethod::Pickup => "pickup",
      ShippingMethod::LocalDelivery => "local_delivery",
      ShippingMethod::Usps => "usps",
      ShippingMethod::Ups => "ups",
      ShippingMethod::Fedex => "fedex",
    }
  }

  pub fn code(&self) -> char {
    match self {
      ShippingMethod::Pickup => 'P',
      ShippingMethod::LocalDelivery => 'L',
      ShippingMethod::Usps => 'U',
      ShippingMethod::Ups => 'S',
      ShippingMethod::Fedex => 'F',
    }
  }

  /// Letter for an arbitrary method name; unknown methods use the pickup code.
  pub fn code_for(raw: &str) -> char {
    Self::parse(raw).unwrap_or(ShippingMethod::Pickup).code()
  }

  pub const CODES: [char; 5] = ['P', 'L', 'U', 'S', 'F'];
}
