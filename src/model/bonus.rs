use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BonusFrequency {
    Monthly,
    /// Paid once, in the year-end month.
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Bonus {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "Rice Allowance")]
    pub name: String,
    #[schema(example = "1500.00", value_type = String)]
    pub amount: Decimal,
    pub frequency: BonusFrequency,
}
