// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Public, fleet-wide statistics

use serde::Serialize;

use crate::database::Database;
use crate::errors::ApiError;
use crate::metrics::{total_calories_burnt, total_distance};

#[derive(Debug, Serialize)]
pub struct UsersNumberResponse {
    pub users_number: i64,
}

#[derive(Debug, Serialize)]
pub struct KilometersNumberResponse {
    pub kilometers_number: f64,
}

#[derive(Debug, Serialize)]
pub struct CaloriesNumberResponse {
    pub calories_number: i64,
}

#[derive(Clone)]
pub struct StatsRoutes {
    database: Database,
}

impl StatsRoutes {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub async fn users_number(&self) -> Result<UsersNumberResponse, ApiError> {
        Ok(UsersNumberResponse {
            users_number: self.database.count_users().await?,
        })
    }

    /// Sum of every stored training's distance
    pub async fn kilometers_number(&self) -> Result<KilometersNumberResponse, ApiError> {
        let records = self.database.training_records().await?;
        Ok(KilometersNumberResponse {
            kilometers_number: total_distance(&records)?,
        })
    }

    /// Calories recomputed for every stored training from its owner's current weight
    pub async fn calories_number(&self) -> Result<CaloriesNumberResponse, ApiError> {
        let records = self.database.training_records().await?;
        Ok(CaloriesNumberResponse {
            calories_number: total_calories_burnt(&records)?,
        })
    }
}
