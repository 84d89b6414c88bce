use std::collections::BTreeMap;

use serde::Serialize;

use clientmerge_core::{ClientIdNo, DestinationId, Entity};

/// 1-based row number inside a destination sheet.
pub type RowIndex = u32;

/// Default base for client numbers.
pub const DEFAULT_STARTING_IDNO: ClientIdNo = ClientIdNo::new(1000);

/// Destination-row allocator (implemented by whatever owns the output sheets).
pub trait RowAllocator {
    /// Destinations known right now.
    fn destinations(&self) -> Vec<DestinationId>;

    /// Reserve the next free row of a destination. Rows are never handed out twice.
    fn allocate_row(&mut self, destination: &DestinationId) -> Option<RowIndex>;
}

impl<A> RowAllocator for &mut A
where
    A: RowAllocator + ?Sized,
{
    fn destinations(&self) -> Vec<DestinationId> {
        (**self).destinations()
    }

    fn allocate_row(&mut self, destination: &DestinationId) -> Option<RowIndex> {
        (**self).allocate_row(destination)
    }
}

/// In-memory allocator for tests/dev.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowAllocator {
    next_rows: BTreeMap<DestinationId, RowIndex>,
    first_row: RowIndex,
}

impl InMemoryRowAllocator {
    pub fn new(first_row: RowIndex) -> Self {
        Self {
            next_rows: BTreeMap::new(),
            first_row,
        }
    }

    pub fn with_destinations<I>(first_row: RowIndex, destinations: I) -> Self
    where
        I: IntoIterator<Item = DestinationId>,
    {
        let mut allocator = Self::new(first_row);
        for destination in destinations {
            allocator.add_destination(destination);
        }
        allocator
    }

    /// Register a destination; a known destination keeps its position.
    pub fn add_destination(&mut self, destination: DestinationId) {
        self.next_rows.entry(destination).or_insert(self.first_row);
    }
}

impl RowAllocator for InMemoryRowAllocator {
    fn destinations(&self) -> Vec<DestinationId> {
        self.next_rows.keys().cloned().collect()
    }

    fn allocate_row(&mut self, destination: &DestinationId) -> Option<RowIndex> {
        let next = self.next_rows.get_mut(destination)?;
        let row = *next;
        *next += 1;
        Some(row)
    }
}

/// A resolved client: its number plus one reserved row per destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIdentity {
    client_idno: ClientIdNo,
    dest_rows: BTreeMap<DestinationId, RowIndex>,
}

impl ClientIdentity {
    pub fn client_idno(&self) -> ClientIdNo {
        self.client_idno
    }

    /// Reserved rows, fixed at creation time.
    pub fn dest_rows(&self) -> &BTreeMap<DestinationId, RowIndex> {
        &self.dest_rows
    }

    pub fn row_for(&self, destination: &DestinationId) -> Option<RowIndex> {
        self.dest_rows.get(destination).copied()
    }
}

impl Entity for ClientIdentity {
    type Id = ClientIdNo;

    fn id(&self) -> Self::Id {
        self.client_idno
    }
}

/// Factory and lookup table for client identities.
#[derive(Debug, Clone)]
pub struct ClientRegistry {
    next_idno: ClientIdNo,
    by_idno: BTreeMap<ClientIdNo, ClientIdentity>,
}

impl ClientRegistry {
    pub fn new(starting_idno: ClientIdNo) -> Self {
        Self {
            next_idno: starting_idno,
            by_idno: BTreeMap::new(),
        }
    }

    /// The number the next identity will receive.
    pub fn next_idno(&self) -> ClientIdNo {
        self.next_idno
    }

    /// Create a new identity and reserve one row in every destination known
    /// to `rows` at this moment.
    ///
    /// Destinations registered later are not added to identities created earlier.
    pub fn create_identity<A>(&mut self, rows: &mut A) -> ClientIdentity
    where
        A: RowAllocator + ?Sized,
    {
        let client_idno = self.next_idno;
        self.next_idno = client_idno.next();

        let dest_rows = rows
            .destinations()
            .into_iter()
            .filter_map(|dest| rows.allocate_row(&dest).map(|row| (dest, row)))
            .collect();

        let identity = ClientIdentity {
            client_idno,
            dest_rows,
        };
        self.by_idno.insert(identity.id(), identity.clone());
        tracing::debug!(client_idno = %client_idno, "created client identity");
        identity
    }

    pub fn get_identity_by_idno(&self, client_idno: ClientIdNo) -> Option<&ClientIdentity> {
        self.by_idno.get(&client_idno)
    }

    pub fn len(&self) -> usize {
        self.by_idno.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_idno.is_empty()
    }

    /// Identities in client-number order.
    pub fn identities(&self) -> impl Iterator<Item = &ClientIdentity> {
        self.by_idno.values()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_IDNO)
    }
}
