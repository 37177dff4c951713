//! Layout storage and the move protocol
//!
//! Drags follow a three-step protocol that is independent of any input
//! device:
//!
//! 1. `begin_move` - snapshot the starting position
//! 2. `apply_delta` - accumulate offsets locally (not persisted)
//! 3. `commit_move` - write the final position once
//!
//! Only commits reach the persistence sink, so intermediate deltas never
//! flood it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::{
    finite, normalize_degrees, AislePosition, AnnotationSpec, LayoutAnnotation, Point, PositionReport,
    PositionStatus,
};
use crate::error::{Error, Result};

/// Something that can be dragged on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum MoveTarget {
    Aisle(u32),
    Annotation(Uuid),
}

impl std::fmt::Display for MoveTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveTarget::Aisle(n) => write!(f, "aisle {}", n),
            MoveTarget::Annotation(id) => write!(f, "annotation {}", id),
        }
    }
}

/// Geometry written by a commit.
#[derive(Debug, Clone, PartialEq)]
pub enum Committed {
    Aisle(AislePosition),
    Annotation(LayoutAnnotation),
}

#[derive(Debug, Clone, Copy)]
struct MoveSession {
    start: Point,
    dx: f64,
    dy: f64,
}

impl MoveSession {
    fn current(&self) -> Point {
        Point::new(self.start.x + self.dx, self.start.y + self.dy)
    }
}

/// Persisted layout of one zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub positions: Vec<AislePosition>,
    pub annotations: Vec<LayoutAnnotation>,
}

/// Aisle positions, annotations and in-flight drags for one zone.
#[derive(Debug, Default)]
pub struct LayoutStore {
    positions: BTreeMap<u32, AislePosition>,
    annotations: Vec<LayoutAnnotation>,
    sessions: HashMap<MoveTarget, MoveSession>,
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LayoutSnapshot) -> Self {
        Self {
            positions: snapshot
                .positions
                .into_iter()
                .map(|p| (p.aisle_number, p))
                .collect(),
            annotations: snapshot.annotations,
            sessions: HashMap::new(),
        }
    }

    /// Committed state only; in-flight drags are not included.
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            positions: self.positions.values().copied().collect(),
            annotations: self.annotations.clone(),
        }
    }

    // =========================================================================
    // Aisle positions
    // =========================================================================

    /// All stored positions ordered by aisle number.
    pub fn positions(&self) -> Vec<AislePosition> {
        self.positions.values().copied().collect()
    }

    pub fn position(&self, aisle: u32) -> Option<AislePosition> {
        self.positions.get(&aisle).copied()
    }

    /// Store a position; the last write for an aisle wins.
    pub fn set_position(&mut self, aisle: u32, x: f64, y: f64, rotation: f64) -> Result<AislePosition> {
        let position = AislePosition::new(aisle, x, y, rotation)?;
        self.positions.insert(aisle, position);
        Ok(position)
    }

    /// Change only the rotation, creating the position at the origin if needed.
    pub fn rotate(&mut self, aisle: u32, rotation: f64) -> Result<AislePosition> {
        let rotation = normalize_degrees(rotation)?;
        let entry = self.positions.entry(aisle).or_insert(AislePosition {
            aisle_number: aisle,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
        });
        entry.rotation = rotation;
        Ok(*entry)
    }

    /// Flag positions whose aisle is not in `aisles`.
    pub fn classify_positions(&self, aisles: &[u32]) -> Vec<PositionReport> {
        self.positions
            .values()
            .map(|position| PositionReport {
                position: *position,
                status: if aisles.contains(&position.aisle_number) {
                    PositionStatus::Active
                } else {
                    PositionStatus::Orphaned
                },
            })
            .collect()
    }

    /// Positions safe to draw for the given structural aisles.
    pub fn visible_positions(&self, aisles: &[u32]) -> Vec<AislePosition> {
        self.classify_positions(aisles)
            .into_iter()
            .filter(|r| r.status == PositionStatus::Active)
            .map(|r| r.position)
            .collect()
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    pub fn annotations(&self) -> &[LayoutAnnotation] {
        &self.annotations
    }

    pub fn annotation(&self, id: &Uuid) -> Option<&LayoutAnnotation> {
        self.annotations.iter().find(|a| a.id == *id)
    }

    pub fn add_annotation(&mut self, spec: AnnotationSpec) -> Result<LayoutAnnotation> {
        spec.validate()?;
        let annotation = LayoutAnnotation {
            id: Uuid::new_v4(),
            kind: spec.kind,
            x: spec.x,
            y: spec.y,
            width: spec.width,
            height: spec.height,
            rotation: normalize_degrees(spec.rotation)?,
            label: spec.label,
            color: spec.color,
        };
        self.annotations.push(annotation.clone());
        Ok(annotation)
    }

    /// Translate an annotation in one step.
    pub fn move_annotation(&mut self, id: &Uuid, dx: f64, dy: f64) -> Result<LayoutAnnotation> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id == *id)
            .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))?;
        let x = finite("x", annotation.x + finite("dx", dx)?)?;
        let y = finite("y", annotation.y + finite("dy", dy)?)?;
        annotation.x = x;
        annotation.y = y;
        Ok(annotation.clone())
    }

    pub fn remove_annotation(&mut self, id: &Uuid) -> Result<LayoutAnnotation> {
        let idx = self
            .annotations
            .iter()
            .position(|a| a.id == *id)
            .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))?;
        self.sessions.remove(&MoveTarget::Annotation(*id));
        Ok(self.annotations.remove(idx))
    }

    // =========================================================================
    // Move protocol
    // =========================================================================

    /// Start dragging; restarting an open drag discards its deltas.
    ///
    /// An aisle without a stored position starts at the origin.
    pub fn begin_move(&mut self, target: MoveTarget) -> Result<Point> {
        let start = match target {
            MoveTarget::Aisle(aisle) => self
                .positions
                .get(&aisle)
                .map(|p| p.origin())
                .unwrap_or_default(),
            MoveTarget::Annotation(id) => self
                .annotation(&id)
                .map(|a| Point::new(a.x, a.y))
                .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))?,
        };
        self.sessions.insert(
            target,
            MoveSession {
                start,
                dx: 0.0,
                dy: 0.0,
            },
        );
        Ok(start)
    }

    /// Accumulate a drag delta; returns where the target is now drawn.
    ///
    /// A delta that would leave the target at a non-finite position is
    /// rejected and the drag keeps its previous offset.
    pub fn apply_delta(&mut self, target: MoveTarget, dx: f64, dy: f64) -> Result<Point> {
        let session = self
            .sessions
            .get_mut(&target)
            .ok_or_else(|| Error::NotFound(format!("no move in progress for {}", target)))?;
        let next = MoveSession {
            start: session.start,
            dx: session.dx + finite("dx", dx)?,
            dy: session.dy + finite("dy", dy)?,
        };
        let end = next.current();
        finite("x", end.x)?;
        finite("y", end.y)?;
        *session = next;
        Ok(end)
    }

    /// Where the target is drawn, including any in-flight drag.
    pub fn displayed(&self, target: MoveTarget) -> Option<Point> {
        if let Some(session) = self.sessions.get(&target) {
            return Some(session.current());
        }
        match target {
            MoveTarget::Aisle(aisle) => self.positions.get(&aisle).map(|p| p.origin()),
            MoveTarget::Annotation(id) => self.annotation(&id).map(|a| Point::new(a.x, a.y)),
        }
    }

    /// Finish a drag and store the final position.
    pub fn commit_move(&mut self, target: MoveTarget) -> Result<Committed> {
        let session = self
            .sessions
            .remove(&target)
            .ok_or_else(|| Error::NotFound(format!("no move in progress for {}", target)))?;
        let end = session.current();
        match target {
            MoveTarget::Aisle(aisle) => {
                let rotation = self.positions.get(&aisle).map(|p| p.rotation).unwrap_or(0.0);
                Ok(Committed::Aisle(self.set_position(aisle, end.x, end.y, rotation)?))
            }
            MoveTarget::Annotation(id) => {
                let annotation = self
                    .annotations
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| Error::NotFound(format!("annotation {}", id)))?;
                annotation.x = end.x;
                annotation.y = end.y;
                Ok(Committed::Annotation(annotation.clone()))
            }
        }
    }

    /// Abandon a drag; returns whether one was open.
    pub fn cancel_move(&mut self, target: MoveTarget) -> bool {
        self.sessions.remove(&target).is_some()
    }
}
