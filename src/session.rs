use crate::route::{RoutePair, RouteRole, ScoredRoute};

/// Sequence number handed out when a route request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteTicket(u64);

/// The caller-held route state: the latest pair and which role is selected.
///
/// Overlapping requests are not deduplicated. Each one takes a ticket, and
/// only the holder of the newest ticket may store its result, so a slow
/// stale response cannot overwrite a fresher one.
#[derive(Debug, Clone)]
pub struct RouteSession {
    issued: u64,
    pair: Option<RoutePair>,
    selected: RouteRole,
}

impl Default for RouteSession {
    fn default() -> Self {
        Self {
            issued: 0,
            pair: None,
            selected: RouteRole::Safe,
        }
    }
}

impl RouteSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> RouteTicket {
        self.issued += 1;
        RouteTicket(self.issued)
    }

    /// Stores `pair` if `ticket` is still the newest. Returns whether it was stored.
    pub fn complete(&mut self, ticket: RouteTicket, pair: RoutePair) -> bool {
        if ticket.0 != self.issued {
            log::debug!("Discarding stale route result #{} (latest #{})", ticket.0, self.issued);
            return false;
        }
        self.pair = Some(pair);
        true
    }

    #[must_use]
    pub const fn current(&self) -> Option<&RoutePair> {
        self.pair.as_ref()
    }

    pub fn select(&mut self, role: RouteRole) {
        self.selected = role;
    }

    #[must_use]
    pub const fn selected(&self) -> RouteRole {
        self.selected
    }

    #[must_use]
    pub fn active_route(&self) -> Option<&ScoredRoute> {
        self.pair.as_ref().map(|p| p.get(self.selected))
    }

    /// Drops the stored pair and invalidates any in-flight request.
    pub fn clear(&mut self) {
        self.issued += 1;
        self.pair = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Coordinate;
    use crate::route::RouteSource;
    use crate::synthetic::SyntheticRouteGenerator;

    fn pair(lat: f64) -> RoutePair {
        let (safe, fast) = SyntheticRouteGenerator::pair(Coordinate::new(lat, 0.0), Coordinate::new(lat, 0.01));
        RoutePair {
            safe,
            fast,
            source: RouteSource::Synthetic,
            fallback_cause: None,
        }
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut session = RouteSession::new();
        let older = session.begin();
        let newer = session.begin();

        assert!(session.complete(newer, pair(2.0)));
        assert!(!session.complete(older, pair(1.0)));

        let stored = session.current().unwrap();
        assert_eq!(stored.fast.coordinates()[0], Coordinate::new(2.0, 0.0));
    }

    #[test]
    fn selection_picks_active_route() {
        let mut session = RouteSession::new();
        assert!(session.active_route().is_none());

        let ticket = session.begin();
        session.complete(ticket, pair(1.0));
        assert_eq!(session.active_route().unwrap().role, RouteRole::Safe);

        session.select(RouteRole::Fast);
        assert_eq!(session.active_route().unwrap().role, RouteRole::Fast);
    }

    #[test]
    fn clear_discards_pair_and_in_flight_request() {
        let mut session = RouteSession::new();
        let done = session.begin();
        session.complete(done, pair(1.0));
        let pending = session.begin();

        session.clear();
        assert!(session.current().is_none());
        assert!(!session.complete(pending, pair(3.0)));
        assert!(session.current().is_none());
    }
}
