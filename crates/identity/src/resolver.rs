use std::collections::HashSet;

use lazy_static::lazy_static;

use clientmerge_core::ClientIdNo;

use crate::client::{ClientIdentity, ClientRegistry, RowAllocator};
use crate::filters::NoiseFilters;
use crate::identifier::Identifier;
use crate::registry::IdentifierRegistry;
use crate::vote::plurality_winner;

lazy_static! {
    static ref DEFAULT_FILTERS: NoiseFilters = NoiseFilters::default();
}

/// How a row's identity was decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Too little corroborating evidence: a new client was created.
    Created(ClientIdentity),
    /// The row was merged into an existing client.
    Matched(ClientIdentity),
}

impl Resolution {
    pub fn identity(&self) -> &ClientIdentity {
        match self {
            Resolution::Created(identity) | Resolution::Matched(identity) => identity,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Per-row identity resolver.
///
/// Create one per input row, feed it the row's identifiers with
/// [`save_identifier`](Self::save_identifier), then call
/// [`resolve_client_identity`](Self::resolve_client_identity). Both registries
/// are borrowed mutably for the lifetime of the resolver, so rows are
/// necessarily resolved one after another.
#[derive(Debug)]
pub struct Resolver<'r> {
    identifiers: &'r mut IdentifierRegistry,
    clients: &'r mut ClientRegistry,
    filters: &'r NoiseFilters,
    matched: Vec<Identifier>,
    unmatched: Vec<Identifier>,
    matched_keys: HashSet<String>,
    unmatched_keys: HashSet<String>,
    matched_types: Vec<String>,
    resolution: Option<Resolution>,
}

impl<'r> Resolver<'r> {
    /// Resolver with the default phone/email noise filters.
    pub fn new(identifiers: &'r mut IdentifierRegistry, clients: &'r mut ClientRegistry) -> Self {
        Self::with_filters(identifiers, clients, &DEFAULT_FILTERS)
    }

    pub fn with_filters(
        identifiers: &'r mut IdentifierRegistry,
        clients: &'r mut ClientRegistry,
        filters: &'r NoiseFilters,
    ) -> Self {
        Self {
            identifiers,
            clients,
            filters,
            matched: Vec::new(),
            unmatched: Vec::new(),
            matched_keys: HashSet::new(),
            unmatched_keys: HashSet::new(),
            matched_types: Vec::new(),
            resolution: None,
        }
    }

    /// Assess one identifier against the registry.
    ///
    /// Returns `false` only when the value is noise; such identifiers leave no
    /// trace. A key known to the registry before this row counts as matched
    /// (once per row); an unknown key is registered right away with no
    /// clients, and repeats of it within the row are ignored.
    pub fn save_identifier(&mut self, identifier: Identifier) -> bool {
        if !self.filters.is_useful(&identifier) {
            tracing::trace!(key = identifier.key(), "ignoring noise identifier");
            return false;
        }

        if self.unmatched_keys.contains(identifier.key()) {
            return true;
        }
        if self.identifiers.contains(identifier.key()) {
            if self.matched_keys.insert(identifier.key().to_string()) {
                if !self.matched_types.iter().any(|t| t == identifier.id_type()) {
                    self.matched_types.push(identifier.id_type().to_string());
                }
                self.matched.push(identifier);
            }
        } else {
            self.identifiers.insert(&identifier);
            self.unmatched_keys.insert(identifier.key().to_string());
            self.unmatched.push(identifier);
        }
        true
    }

    /// Decide the row's client and bind every saved identifier to it.
    ///
    /// Returns `None` when the row carried no usable identifiers. Fewer than
    /// `threshold` distinct matched types creates a new client; otherwise the
    /// client shared by most matched identifiers wins (lowest number on ties).
    /// Calling this again reuses the earlier decision.
    pub fn resolve_client_identity<A>(
        &mut self,
        threshold: usize,
        rows: &mut A,
    ) -> Option<ClientIdentity>
    where
        A: RowAllocator + ?Sized,
    {
        if self.matched.is_empty() && self.unmatched.is_empty() {
            return None;
        }

        if self.resolution.is_none() {
            let resolution = self.decide(threshold, rows);
            tracing::debug!(
                client_idno = %resolution.identity().client_idno(),
                new = resolution.is_new(),
                matched = self.matched.len(),
                unmatched = self.unmatched.len(),
                matched_types = ?self.matched_types,
                "resolved row identity"
            );
            self.resolution = Some(resolution);
        }

        let identity = self.resolution.as_ref()?.identity().clone();
        self.commit(identity.client_idno());
        Some(identity)
    }

    fn decide<A>(&mut self, threshold: usize, rows: &mut A) -> Resolution
    where
        A: RowAllocator + ?Sized,
    {
        if self.matched_types.len() < threshold {
            return Resolution::Created(self.clients.create_identity(rows));
        }

        let winner = plurality_winner(
            self.matched
                .iter()
                .filter_map(|identifier| self.identifiers.get(identifier.key()))
                .map(|entry| entry.client_ids()),
        );

        // Keys left behind by a resolver that never resolved carry no clients.
        let existing = winner
            .and_then(|idno| self.clients.get_identity_by_idno(idno))
            .cloned();
        match existing {
            Some(identity) => Resolution::Matched(identity),
            None => Resolution::Created(self.clients.create_identity(rows)),
        }
    }

    fn commit(&mut self, client_idno: ClientIdNo) {
        for identifier in self.matched.iter().chain(self.unmatched.iter()) {
            self.identifiers.bind(identifier.key(), client_idno);
        }
    }

    /// Identifiers whose key was already registered (one per key).
    pub fn matched(&self) -> &[Identifier] {
        &self.matched
    }

    /// Identifiers that were new to the registry.
    pub fn unmatched(&self) -> &[Identifier] {
        &self.unmatched
    }

    /// Distinct matched types, in first-seen order.
    pub fn matched_types(&self) -> &[String] {
        &self.matched_types
    }

    /// Every accepted identifier, matched first.
    pub fn accepted(&self) -> impl Iterator<Item = &Identifier> {
        self.matched.iter().chain(self.unmatched.iter())
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::client::InMemoryRowAllocator;
    use clientmerge_core::DestinationId;
    use proptest::prelude::*;

    struct Fixture {
        identifiers: IdentifierRegistry,
        clients: ClientRegistry,
        rows: InMemoryRowAllocator,
    }

    impl Fixture {
        fn new() -> Self {
            let dests = ["ims", "fb"].map(|d| DestinationId::parse(d).unwrap());
            Self {
                identifiers: IdentifierRegistry::new(),
                clients: ClientRegistry::new(ClientIdNo::new(1000)),
                rows: InMemoryRowAllocator::with_destinations(2, dests),
            }
        }

        fn resolve(&mut self, row: &[(&str, &str)], threshold: usize) -> Option<ClientIdentity> {
            let mut resolver = Resolver::new(&mut self.identifiers, &mut self.clients);
            for (id_type, value) in row {
                resolver.save_identifier(Identifier::new(id_type, value));
            }
            resolver.resolve_client_identity(threshold, &mut self.rows)
        }

        fn clients_of(&self, key: &str) -> BTreeSet<u64> {
            self.identifiers
                .get(key)
                .unwrap()
                .client_ids()
                .iter()
                .map(|id| id.get())
                .collect()
        }
    }

    const ROW_A: &[(&str, &str)] = &[
        ("client id", "99912345"),
        ("phone", "(999) 888-0001"),
        ("phone", "(999) 888-8708"),
        ("email", "albe@gmail.not"),
    ];
    const ROW_B: &[(&str, &str)] = &[
        ("client id", "99912345"),
        ("phone", "999-888-0001"),
        ("email", "albeebee@gmail.not"),
    ];
    const ROW_C: &[(&str, &str)] = &[
        ("client id", "99912345"),
        ("phone", "999-888-0001"),
        ("email", "albe@gmail.not"),
    ];

    #[test]
    fn new_resolver_starts_empty() {
        let mut fx = Fixture::new();
        let resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        assert!(resolver.matched().is_empty());
        assert!(resolver.unmatched().is_empty());
        assert!(resolver.matched_types().is_empty());
        assert!(resolver.resolution().is_none());
    }

    #[test]
    fn row_without_usable_identifiers_resolves_to_none() {
        let mut fx = Fixture::new();
        assert_eq!(fx.resolve(&[], 3), None);
        assert_eq!(fx.resolve(&[("phone", "000-000-0000"), ("email", "noemail")], 3), None);
        assert!(fx.clients.is_empty());
        assert!(fx.identifiers.is_empty());
        assert_eq!(fx.clients.next_idno(), ClientIdNo::new(1000));
    }

    #[test]
    fn noise_is_rejected_without_state_change() {
        let mut fx = Fixture::new();
        let mut resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        for (id_type, value) in [
            ("phone", "(999) 888-0000"),
            ("phone", "(999) 888-9999"),
            ("phone", "12345"),
            ("email", "noemail"),
            ("email", "botched@com"),
        ] {
            assert!(!resolver.save_identifier(Identifier::new(id_type, value)));
        }
        assert!(resolver.unmatched().is_empty());
        drop(resolver);
        assert!(fx.identifiers.is_empty());
    }

    #[test]
    fn unmatched_identifiers_are_registered_immediately() {
        let mut fx = Fixture::new();
        let mut resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        assert!(resolver.save_identifier(Identifier::new("phone", "(999) 888-0001")));
        assert!(resolver.save_identifier(Identifier::new("email", "albe@gmail.not")));
        assert!(resolver.save_identifier(Identifier::new("client id", "123456789")));
        assert_eq!(resolver.matched().len(), 0);
        assert_eq!(resolver.unmatched().len(), 3);
        drop(resolver);
        assert_eq!(fx.identifiers.len(), 3);
        assert!(fx.identifiers.get("phone::9998880001").unwrap().client_ids().is_empty());
    }

    #[test]
    fn duplicate_keys_in_one_row_count_once() {
        let mut fx = Fixture::new();
        fx.resolve(ROW_A, 3);

        let mut resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        resolver.save_identifier(Identifier::new("phone", "(999) 888-0001"));
        resolver.save_identifier(Identifier::new("phone", "999.888.0001"));
        resolver.save_identifier(Identifier::new("client id", "99912345"));
        resolver.save_identifier(Identifier::new("email", "albe@gmail.not"));

        assert_eq!(resolver.matched().len(), 3);
        assert_eq!(resolver.matched_types(), ["phone", "client id", "email"]);
    }

    #[test]
    fn repeated_new_key_in_one_row_does_not_count_as_matched() {
        let mut fx = Fixture::new();
        let first = fx.resolve(&[("client id", "1"), ("phone", "555-1234")], 2).unwrap();
        assert_eq!(first.client_idno(), ClientIdNo::new(1000));

        let mut resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        assert!(resolver.save_identifier(Identifier::new("client id", "1")));
        assert!(resolver.save_identifier(Identifier::new("phone", "555-9876")));
        assert!(resolver.save_identifier(Identifier::new("phone", "555.9876")));
        assert_eq!(resolver.matched_types(), ["client id"]);
        assert_eq!(resolver.matched().len(), 1);
        assert_eq!(resolver.unmatched().len(), 1);

        // Only one type existed before the row: below threshold 2.
        let second = resolver.resolve_client_identity(2, &mut fx.rows).unwrap();
        assert_eq!(second.client_idno(), ClientIdNo::new(1001));
        assert!(resolver.resolution().unwrap().is_new());
        drop(resolver);
        assert_eq!(fx.clients_of("phone::5559876"), BTreeSet::from([1001]));
    }

    #[test]
    fn threshold_boundary() {
        // Two matched types at threshold 3: new identity.
        let mut fx = Fixture::new();
        fx.resolve(ROW_A, 3);
        let b = fx.resolve(ROW_B, 3).unwrap();
        assert_eq!(b.client_idno(), ClientIdNo::new(1001));

        // Three matched types at threshold 3: merged.
        let mut fx = Fixture::new();
        fx.resolve(ROW_A, 3);
        let c = fx.resolve(ROW_C, 3).unwrap();
        assert_eq!(c.client_idno(), ClientIdNo::new(1000));
        assert_eq!(fx.clients.len(), 1);
    }

    #[test]
    fn three_row_scenario() {
        let mut fx = Fixture::new();

        let a = fx.resolve(ROW_A, 3).unwrap();
        assert_eq!(a.client_idno(), ClientIdNo::new(1000));
        for key in [
            "client id::99912345",
            "phone::9998880001",
            "phone::9998888708",
            "email::albe@gmail.not",
        ] {
            assert_eq!(fx.clients_of(key), BTreeSet::from([1000]), "{key}");
        }

        let b = fx.resolve(ROW_B, 3).unwrap();
        assert_eq!(b.client_idno(), ClientIdNo::new(1001));

        let c = fx.resolve(ROW_C, 3).unwrap();
        assert_eq!(c.client_idno(), ClientIdNo::new(1000));
        assert_eq!(c, a);

        assert!(fx.clients.get_identity_by_idno(ClientIdNo::new(1000)).is_some());
        assert!(fx.clients.get_identity_by_idno(ClientIdNo::new(1001)).is_some());
        assert_eq!(fx.clients.next_idno(), ClientIdNo::new(1002));
        assert_eq!(fx.clients_of("client id::99912345"), BTreeSet::from([1000, 1001]));
        assert_eq!(fx.clients_of("phone::9998880001"), BTreeSet::from([1000, 1001]));
        assert_eq!(fx.clients_of("email::albe@gmail.not"), BTreeSet::from([1000]));
        assert_eq!(fx.clients_of("email::albeebee@gmail.not"), BTreeSet::from([1001]));
    }

    #[test]
    fn created_identities_reserve_destination_rows() {
        let mut fx = Fixture::new();
        let a = fx.resolve(ROW_A, 3).unwrap();
        let b = fx.resolve(ROW_B, 3).unwrap();
        let ims = DestinationId::parse("ims").unwrap();
        assert_eq!(a.row_for(&ims), Some(2));
        assert_eq!(b.row_for(&ims), Some(3));
    }

    #[test]
    fn row_order_changes_the_outcome() {
        let r1: &[(&str, &str)] = &[("client id", "1"), ("phone", "555-1234")];
        let r2: &[(&str, &str)] = &[("client id", "1"), ("email", "c@mail.org")];
        let r3: &[(&str, &str)] = &[("phone", "555-1234"), ("email", "c@mail.org")];

        let mut forward = Fixture::new();
        let f1 = forward.resolve(r1, 2).unwrap().client_idno();
        let f2 = forward.resolve(r2, 2).unwrap().client_idno();
        let f3 = forward.resolve(r3, 2).unwrap().client_idno();
        assert_eq!(f3, f1);
        assert_ne!(f3, f2);

        let mut reordered = Fixture::new();
        let o3 = reordered.resolve(r3, 2).unwrap().client_idno();
        let o1 = reordered.resolve(r1, 2).unwrap().client_idno();
        let o2 = reordered.resolve(r2, 2).unwrap().client_idno();
        assert_eq!(o2, o3);
        assert_ne!(o1, o3);
    }

    #[test]
    fn second_resolve_reuses_the_decision() {
        let mut fx = Fixture::new();
        let mut resolver = Resolver::new(&mut fx.identifiers, &mut fx.clients);
        resolver.save_identifier(Identifier::new("client id", "1"));
        let first = resolver.resolve_client_identity(2, &mut fx.rows);
        resolver.save_identifier(Identifier::new("client id", "2"));
        let second = resolver.resolve_client_identity(2, &mut fx.rows);
        assert_eq!(first, second);
        drop(resolver);
        assert_eq!(fx.clients.len(), 1);
        assert_eq!(fx.clients_of("client id::2"), BTreeSet::from([1000]));
    }

    #[test]
    fn custom_filters_apply() {
        let mut fx = Fixture::new();
        let filters = NoiseFilters::empty();
        let mut resolver = Resolver::with_filters(&mut fx.identifiers, &mut fx.clients, &filters);
        assert!(resolver.save_identifier(Identifier::new("phone", "000-000-0000")));
    }

    type Outcome = (Vec<Option<u64>>, Vec<(String, Vec<u64>)>);

    fn run(rows: &[Vec<(u8, u8)>], threshold: usize) -> Outcome {
        let mut fx = Fixture::new();
        let types = ["client id", "phone", "email"];
        let mut assigned = Vec::new();
        for row in rows {
            let row: Vec<(String, String)> = row
                .iter()
                .map(|(t, v)| {
                    let id_type = types[*t as usize % types.len()];
                    let value = match id_type {
                        "phone" => format!("555-12{v:02}"),
                        "email" => format!("c{v}@mail.org"),
                        _ => v.to_string(),
                    };
                    (id_type.to_string(), value)
                })
                .collect();
            let pairs: Vec<(&str, &str)> =
                row.iter().map(|(t, v)| (t.as_str(), v.as_str())).collect();
            assigned.push(fx.resolve(&pairs, threshold).map(|i| i.client_idno().get()));
        }
        let registry: Vec<(String, Vec<u64>)> = fx
            .identifiers
            .entries()
            .into_iter()
            .map(|(k, e)| (k.to_string(), e.client_ids().iter().map(|c| c.get()).collect()))
            .collect();
        (assigned, registry)
    }

    proptest! {
        /// Property: replaying the same rows against fresh registries gives the same result.
        #[test]
        fn resolution_is_deterministic(
            rows in prop::collection::vec(prop::collection::vec((0u8..3, 0u8..6), 0..5), 1..12),
            threshold in 1usize..4,
        ) {
            prop_assert_eq!(run(&rows, threshold), run(&rows, threshold));
        }

        /// Property: client numbers are handed out without gaps and every
        /// committed identifier points at an existing client.
        #[test]
        fn every_binding_names_a_created_client(
            rows in prop::collection::vec(prop::collection::vec((0u8..3, 0u8..6), 0..5), 1..12),
            threshold in 1usize..4,
        ) {
            let (assigned, registry) = run(&rows, threshold);
            let max = assigned.iter().flatten().copied().max();
            for (_, clients) in registry {
                for c in clients {
                    prop_assert!(c >= 1000);
                    prop_assert!(Some(c) <= max);
                }
            }
        }
    }
}
