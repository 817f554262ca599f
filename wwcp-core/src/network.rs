//! The collaborators above a charging station: pool, operator, and roaming
//! network.
//!
//! These three only get as much behavior as the station layer actually
//! touches — attribute inheritance and containment. Their own admin/
//! operational lifecycles, reservation routing, and so on are out of scope
//! (SPEC_FULL.md §1 Non-goals: "EVSE/Pool/Operator/RoamingNetwork beyond
//! touch-points").

use crate::entity::{EntityBase, ReactiveMap};
use crate::ids::{OperatorId, PoolId};
use crate::station::{AttributeKind, ChargingStation};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// A charging station operator: the routing collaborator a pool falls back
/// to for inherited attributes.
pub struct Operator {
    pub base: EntityBase<OperatorId>,
    pools: ReactiveMap<PoolId, ChargingPool>,
    local_attrs: Mutex<HashMap<AttributeKind, String>>,
}

impl Operator {
    pub fn new(id: OperatorId) -> Arc<Self> {
        Arc::new(Self {
            base: EntityBase::new(id),
            pools: ReactiveMap::new(),
            local_attrs: Mutex::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> &OperatorId {
        &self.base.id
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<String> {
        self.local_attrs.lock().get(&kind).cloned()
    }

    pub fn set_attribute(&self, kind: AttributeKind, value: Option<String>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.local_attrs.lock().insert(kind, v);
            }
            _ => {
                self.local_attrs.lock().remove(&kind);
            }
        }
    }

    pub fn adopt_pool(self: &Arc<Self>, pool: Arc<ChargingPool>) -> bool {
        self.pools.insert(pool.id().clone(), pool)
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn get_pool(&self, id: &PoolId) -> Option<Arc<ChargingPool>> {
        self.pools.get(id)
    }
}

/// A charging pool: a geographic grouping of stations under one operator.
/// Provides the attribute fallback a station's own [`AttributeKind`] reads
/// hit when it has no local override.
pub struct ChargingPool {
    pub base: EntityBase<PoolId>,
    pub operator_id: OperatorId,
    operator: Weak<Operator>,
    stations: ReactiveMap<crate::ids::StationId, ChargingStation>,
    local_attrs: Mutex<HashMap<AttributeKind, String>>,
}

impl ChargingPool {
    pub fn new(id: PoolId, operator_id: OperatorId, operator: Weak<Operator>) -> Arc<Self> {
        Arc::new(Self {
            base: EntityBase::new(id),
            operator_id,
            operator,
            stations: ReactiveMap::new(),
            local_attrs: Mutex::new(HashMap::new()),
        })
    }

    pub fn id(&self) -> &PoolId {
        &self.base.id
    }

    pub fn attribute(&self, kind: AttributeKind) -> Option<String> {
        if let Some(local) = self.local_attrs.lock().get(&kind).cloned() {
            return Some(local);
        }
        self.operator.upgrade().and_then(|op| op.attribute(kind))
    }

    pub fn set_attribute(&self, kind: AttributeKind, value: Option<String>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.local_attrs.lock().insert(kind, v);
            }
            _ => {
                self.local_attrs.lock().remove(&kind);
            }
        }
    }

    /// Register a station as belonging to this pool. The station must
    /// already hold a `Weak<ChargingPool>` pointing back here (built via
    /// [`ChargingStation::new`]) — this only makes the containment
    /// navigable in the other direction.
    pub fn adopt_station(&self, station: Arc<ChargingStation>) -> bool {
        self.stations.insert(station.base.id.clone(), station)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn get_station(&self, id: &crate::ids::StationId) -> Option<Arc<ChargingStation>> {
        self.stations.get(id)
    }
}

/// The top of the hierarchy: a collection of operators. Out of scope
/// beyond containment (SPEC_FULL.md §1 Non-goals).
pub struct RoamingNetwork {
    pub base: EntityBase<String>,
    operators: ReactiveMap<OperatorId, Operator>,
}

impl RoamingNetwork {
    pub fn new(id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            base: EntityBase::new(id.into()),
            operators: ReactiveMap::new(),
        })
    }

    pub fn adopt_operator(&self, operator: Arc<Operator>) -> bool {
        self.operators.insert(operator.id().clone(), operator)
    }

    pub fn operator_count(&self) -> usize {
        self.operators.len()
    }

    pub fn get_operator(&self, id: &OperatorId) -> Option<Arc<Operator>> {
        self.operators.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;
    use crate::ids::StationId;

    #[test]
    fn pool_falls_back_to_operator_attribute() {
        let operator = Operator::new(OperatorId::new("OP1"));
        operator.set_attribute(AttributeKind::Hotline, Some("+49-800".into()));
        let pool = ChargingPool::new(PoolId::new("P1"), operator.id().clone(), Arc::downgrade(&operator));
        operator.adopt_pool(Arc::clone(&pool));

        assert_eq!(pool.attribute(AttributeKind::Hotline), Some("+49-800".to_string()));
        pool.set_attribute(AttributeKind::Hotline, Some("+49-900".into()));
        assert_eq!(pool.attribute(AttributeKind::Hotline), Some("+49-900".to_string()));
    }

    #[test]
    fn station_attribute_chain_reaches_through_pool() {
        let operator = Operator::new(OperatorId::new("OP1"));
        let pool = ChargingPool::new(PoolId::new("P1"), operator.id().clone(), Arc::downgrade(&operator));
        operator.adopt_pool(Arc::clone(&pool));
        pool.set_attribute(AttributeKind::Name, Some("Pool".into()));

        let station = ChargingStation::new(
            StationId::new("S1"),
            pool.id().clone(),
            Arc::downgrade(&pool),
            StationConfig::default(),
        );
        pool.adopt_station(Arc::clone(&station));

        assert_eq!(station.name(), Some("Pool".to_string()));
    }
}
