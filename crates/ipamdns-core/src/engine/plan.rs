//! Pure reconciliation planning
//!
//! [`plan`] turns an event plus a snapshot of what DNS currently holds into
//! the ordered list of mutations that makes DNS match the event. It does no
//! I/O, so every decision can be tested by handing it a hand-built
//! [`Observation`].

use crate::error::Operation;
use crate::event::AddressChangeEvent;
use crate::name::{AddressFamily, DomainName, reverse_name};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

/// What DNS says about the event's name (forward side)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardObservation {
    /// Addresses of the event's family the name resolves to
    pub addresses: BTreeSet<IpAddr>,
    /// PTR targets of each other address found above
    ///
    /// An address missing from the map could not be observed (reverse zone
    /// not configured, or the query failed); its PTR is left alone.
    pub other_reverse: BTreeMap<IpAddr, BTreeSet<DomainName>>,
}

/// What DNS says about the event's address (reverse side)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseObservation {
    /// Names the address's PTR records point at
    pub names: BTreeSet<DomainName>,
    /// Forward addresses (event family) of each other name found above
    ///
    /// A name missing from the map could not be observed; its forward
    /// records are left alone.
    pub other_forward: BTreeMap<DomainName, BTreeSet<IpAddr>>,
}

/// Snapshot of DNS taken at the start of one reconciliation
///
/// `None` on a side means it is not reconciled: the event has no name
/// (forward), the zone is not configured, or the primary query failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Observation {
    pub forward: Option<ForwardObservation>,
    pub reverse: Option<ReverseObservation>,
}

/// A single record change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mutation {
    AddForward { name: DomainName, address: IpAddr },
    RemoveForward { name: DomainName, address: IpAddr },
    AddReverse { address: IpAddr, name: DomainName },
    RemoveReverse { address: IpAddr, name: DomainName },
}

impl Mutation {
    pub fn operation(&self) -> Operation {
        match self {
            Mutation::AddForward { .. } => Operation::AddForward,
            Mutation::RemoveForward { .. } => Operation::RemoveForward,
            Mutation::AddReverse { .. } => Operation::AddReverse,
            Mutation::RemoveReverse { .. } => Operation::RemoveReverse,
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Mutation::AddForward { .. } | Mutation::AddReverse { .. })
    }

    /// The record's address, whichever direction it points
    pub fn address(&self) -> IpAddr {
        match self {
            Mutation::AddForward { address, .. }
            | Mutation::RemoveForward { address, .. }
            | Mutation::AddReverse { address, .. }
            | Mutation::RemoveReverse { address, .. } => *address,
        }
    }

    /// The record's forward name, whichever direction it points
    pub fn name(&self) -> &DomainName {
        match self {
            Mutation::AddForward { name, .. }
            | Mutation::RemoveForward { name, .. }
            | Mutation::AddReverse { name, .. }
            | Mutation::RemoveReverse { name, .. } => name,
        }
    }

    /// The record in zone-file form, e.g. `host.example.com A 10.0.0.5`
    pub fn record(&self) -> String {
        match self {
            Mutation::AddForward { name, address } | Mutation::RemoveForward { name, address } => {
                format!("{} {} {}", name, AddressFamily::of(address), address)
            }
            Mutation::AddReverse { address, name } | Mutation::RemoveReverse { address, name } => {
                format!("{} PTR {}", reverse_name(address), name)
            }
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.is_add() { "add" } else { "remove" };
        write!(f, "{} {}", verb, self.record())
    }
}

/// Ordered mutations for one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub mutations: Vec<Mutation>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    fn push(&mut self, mutation: Mutation) {
        if !self.mutations.contains(&mutation) {
            self.mutations.push(mutation);
        }
    }
}

/// Compute the mutations that bring DNS in line with `event`
///
/// Order: stale forward records of the name (each followed by its PTR if
/// that still claims the name), the forward add, stale PTRs of the address
/// (each followed by the forward record that pointed back), the PTR add.
///
/// Addresses of the other family are ignored everywhere, so an IPv6 event
/// never plans an A or `in-addr.arpa` change.
pub fn plan(event: &AddressChangeEvent, observed: &Observation) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    let family = event.family();
    let address = event.address;

    if let (Some(name), Some(forward)) = (&event.dns_name, &observed.forward) {
        for other in forward
            .addresses
            .iter()
            .filter(|a| family.matches(a) && **a != address)
        {
            plan.push(Mutation::RemoveForward {
                name: name.clone(),
                address: *other,
            });

            let points_back = forward
                .other_reverse
                .get(other)
                .is_some_and(|names| names.contains(name));
            if points_back {
                plan.push(Mutation::RemoveReverse {
                    address: *other,
                    name: name.clone(),
                });
            }
        }

        if !forward.addresses.contains(&address) {
            plan.push(Mutation::AddForward {
                name: name.clone(),
                address,
            });
        }
    }

    if let Some(reverse) = &observed.reverse {
        for other in reverse
            .names
            .iter()
            .filter(|n| Some(*n) != event.dns_name.as_ref())
        {
            plan.push(Mutation::RemoveReverse {
                address,
                name: other.clone(),
            });

            let points_back = reverse
                .other_forward
                .get(other)
                .is_some_and(|addresses| addresses.contains(&address));
            if points_back {
                plan.push(Mutation::RemoveForward {
                    name: other.clone(),
                    address,
                });
            }
        }

        if let Some(name) = &event.dns_name {
            if !reverse.names.contains(name) {
                plan.push(Mutation::AddReverse {
                    address,
                    name: name.clone(),
                });
            }
        }
    }

    plan
}

/// Mutations that retire the forward record `name -> address`
///
/// Used when an address is deleted while its former name is known: the
/// record is removed even when no PTR pointed back at it. `current` holds
/// the name's addresses of the same family.
pub fn plan_retirement(
    name: &DomainName,
    address: IpAddr,
    current: &BTreeSet<IpAddr>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();
    if current.contains(&address) {
        plan.push(Mutation::RemoveForward {
            name: name.clone(),
            address,
        });
    }
    plan
}
