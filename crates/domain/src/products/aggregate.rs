use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cqrs_es::Aggregate;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

use super::{Command, Event};

/// Direction of a stock adjustment
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StockOperation {
    Add,
    Subtract,
}

/// Product aggregate. Stock only moves through `AdjustStock`, so the event
/// stream doubles as the inventory ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price_cents: u64,
    pub stock_quantity: u32,
    pub prescription_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const AGGREGATE_TYPE: &str = "Product";

#[derive(Clone, Default)]
pub struct Services {}

#[async_trait]
impl Aggregate for Product {
    type Command = Command;
    type Event = Event;
    type Error = Error;
    type Services = Services;

    fn aggregate_type() -> String {
        AGGREGATE_TYPE.to_string()
    }

    async fn handle(
        &self,
        command: Self::Command,
        _services: &Self::Services,
    ) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            Command::Create {
                id,
                name,
                price_cents,
                stock_quantity,
                prescription_required,
            } => {
                self.validate_new()?;
                if name.is_empty() {
                    return Err(Error::Validation {
                        message: "product name must not be empty".to_string(),
                    });
                }

                Ok(vec![Event::Created {
                    id,
                    name,
                    price_cents,
                    stock_quantity,
                    prescription_required,
                    created_at: Utc::now(),
                }])
            }

            Command::AdjustStock {
                quantity,
                operation,
            } => {
                self.validate_existing()?;
                if quantity == 0 {
                    return Err(Error::Validation {
                        message: "stock adjustment quantity must be positive".to_string(),
                    });
                }

                let stock_quantity = match operation {
                    StockOperation::Add => self
                        .stock_quantity
                        .checked_add(quantity)
                        .ok_or_else(|| Error::Validation {
                            message: "stock quantity overflow".to_string(),
                        })?,
                    StockOperation::Subtract => {
                        if quantity > self.stock_quantity {
                            return Err(Error::InsufficientStock {
                                product_id: self.id.clone(),
                                requested: quantity,
                                available: self.stock_quantity,
                            });
                        }
                        self.stock_quantity - quantity
                    }
                };

                Ok(vec![Event::StockAdjusted {
                    id: self.id.clone(),
                    operation,
                    quantity,
                    stock_quantity,
                    updated_at: Utc::now(),
                }])
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            Event::Created {
                id,
                name,
                price_cents,
                stock_quantity,
                prescription_required,
                created_at,
            } => {
                self.id = id;
                self.name = name;
                self.price_cents = price_cents;
                self.stock_quantity = stock_quantity;
                self.prescription_required = prescription_required;
                self.created_at = created_at;
                self.updated_at = created_at;
            }

            Event::StockAdjusted {
                stock_quantity,
                updated_at,
                ..
            } => {
                self.stock_quantity = stock_quantity;
                self.updated_at = updated_at;
            }
        }
    }
}

impl Product {
    fn validate_new(&self) -> Result<(), Error> {
        if !self.id.is_empty() {
            return Err(Error::AlreadyExists {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }

    fn validate_existing(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::NotFound {
                entity: AGGREGATE_TYPE.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use cqrs_es::test::TestFramework;

    use super::{Product, Services, StockOperation};
    use crate::products::{Command, Event};

    type ProductTester = TestFramework<Product>;

    fn created() -> Event {
        Event::Created {
            id: "prod-1".to_string(),
            name: "Paracetamol 500mg".to_string(),
            price_cents: 499,
            stock_quantity: 5,
            prescription_required: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_registers_the_product() {
        let events = ProductTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::Create {
                id: "prod-1".to_string(),
                name: "Paracetamol 500mg".to_string(),
                price_cents: 499,
                stock_quantity: 5,
                prescription_required: false,
            })
            .inspect_result()
            .expect("create should succeed");

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::Created {
                stock_quantity: 5,
                prescription_required: false,
                ..
            }
        ));
    }

    #[test]
    fn create_twice_is_rejected() {
        ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::Create {
                id: "prod-1".to_string(),
                name: "Paracetamol 500mg".to_string(),
                price_cents: 499,
                stock_quantity: 5,
                prescription_required: false,
            })
            .then_expect_error_message("Product already exists");
    }

    #[test]
    fn subtract_within_stock_records_the_new_level() {
        let events = ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::AdjustStock {
                quantity: 2,
                operation: StockOperation::Subtract,
            })
            .inspect_result()
            .expect("adjustment should succeed");

        assert!(matches!(
            &events[0],
            Event::StockAdjusted {
                operation: StockOperation::Subtract,
                quantity: 2,
                stock_quantity: 3,
                ..
            }
        ));
    }

    #[test]
    fn subtract_below_zero_is_rejected() {
        ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::AdjustStock {
                quantity: 6,
                operation: StockOperation::Subtract,
            })
            .then_expect_error_message(
                "insufficient stock for product prod-1: requested 6, available 5",
            );
    }

    #[test]
    fn add_raises_the_level() {
        let events = ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::AdjustStock {
                quantity: 7,
                operation: StockOperation::Add,
            })
            .inspect_result()
            .expect("adjustment should succeed");

        assert!(matches!(
            &events[0],
            Event::StockAdjusted {
                stock_quantity: 12,
                ..
            }
        ));
    }

    #[test]
    fn add_past_the_stock_ceiling_is_rejected() {
        ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::AdjustStock {
                quantity: u32::MAX,
                operation: StockOperation::Add,
            })
            .then_expect_error_message("stock quantity overflow");
    }

    #[test]
    fn zero_quantity_adjustment_is_rejected() {
        ProductTester::with(Services::default())
            .given(vec![created()])
            .when(Command::AdjustStock {
                quantity: 0,
                operation: StockOperation::Add,
            })
            .then_expect_error_message("stock adjustment quantity must be positive");
    }

    #[test]
    fn adjusting_an_unknown_product_is_rejected() {
        ProductTester::with(Services::default())
            .given_no_previous_events()
            .when(Command::AdjustStock {
                quantity: 1,
                operation: StockOperation::Add,
            })
            .then_expect_error_message("Product not found");
    }
}
