use serde::Serialize;

use crate::domain::{Cents, DomainError, Route};

/// Counters for one output family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteCounters {
    /// Entity rows written
    pub entities: u64,
    /// Module rows written
    pub modules: u64,
    /// Sum of module contributions
    pub balance: Cents,
}

/// Per-route counters for one area's run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    a: RouteCounters,
    b: RouteCounters,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, route: Route) -> &RouteCounters {
        match route {
            Route::A => &self.a,
            Route::B => &self.b,
        }
    }

    fn route_mut(&mut self, route: Route) -> &mut RouteCounters {
        match route {
            Route::A => &mut self.a,
            Route::B => &mut self.b,
        }
    }

    pub fn record_entity(&mut self, route: Route) {
        self.route_mut(route).entities += 1;
    }

    pub fn record_module(&mut self, route: Route, contribution: Cents) -> Result<(), DomainError> {
        let counters = self.route_mut(route);
        counters.balance = counters
            .balance
            .checked_add(contribution)
            .ok_or(DomainError::Overflow)?;
        counters.modules += 1;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Route, &RouteCounters)> {
        Route::ALL.into_iter().map(move |route| (route, self.route(route)))
    }
}
