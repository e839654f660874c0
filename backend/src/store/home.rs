use super::{read, write};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeState {
    pub presence: bool,
    pub electricity_price: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeStateUpdate {
    pub presence: Option<bool>,
    pub electricity_price: Option<f64>,
}

/// Occupancy and current tariff, the inputs to presence and price conditions.
pub struct HomeStatus {
    state: RwLock<HomeState>,
}

impl HomeStatus {
    pub fn new(electricity_price: f64) -> Self {
        Self {
            state: RwLock::new(HomeState {
                presence: true,
                electricity_price,
                updated_at: Utc::now(),
            }),
        }
    }

    pub fn get(&self) -> HomeState {
        read(&self.state).clone()
    }

    pub fn update(&self, update: HomeStateUpdate) -> Result<HomeState> {
        if let Some(price) = update.electricity_price {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::InvalidUsageValue {
                    field: "electricityPrice",
                    value: price,
                });
            }
        }

        let mut state = write(&self.state);
        if let Some(presence) = update.presence {
            state.presence = presence;
        }
        if let Some(price) = update.electricity_price {
            state.electricity_price = price;
        }
        state.updated_at = Utc::now();
        Ok(state.clone())
    }
}
