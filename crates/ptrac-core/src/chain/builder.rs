use super::tree::FissionChainTree;
use crate::domain::{Event, NeutronHistory, NpsHistory, PtracError, PtracResult, Reaction, Vertex};
use crate::format::{CollisionOutcome, EventKind, FormatConfig};
use tracing::{debug, warn};

/// A neutron whose destruction has not been decoded yet.
#[derive(Debug, Clone, Copy)]
struct OpenSegment {
    creation: Vertex,
    last_seen: Vertex,
}

/// Incremental fission-chain reconstruction for one NPS.
///
/// Events are fed in decode order. A neutron is inserted into the tree as
/// soon as its destruction is seen: a multiplying or capture collision, or
/// the terminal event of its track. When a track goes on after a
/// multiplying collision, the remainder is a new neutron created by that
/// reaction.
pub struct ChainBuilder<'c> {
    config: &'c FormatConfig,
    nps: Option<i64>,
    tree: Option<FissionChainTree>,
    segment: Option<OpenSegment>,
    continuation: Option<Vertex>,
    absorbed: bool,
}

impl<'c> ChainBuilder<'c> {
    pub fn new(config: &'c FormatConfig) -> Self {
        Self {
            config,
            nps: None,
            tree: None,
            segment: None,
            continuation: None,
            absorbed: false,
        }
    }

    pub fn tree(&self) -> Option<&FissionChainTree> {
        self.tree.as_ref()
    }

    pub fn observe(&mut self, event: &Event) -> PtracResult<()> {
        let nps = *self.nps.get_or_insert(event.particle_id);
        let kind = self.config.classify(event.event_code);

        if let Some(origin) = self.continuation.take()
            && matches!(
                kind,
                EventKind::Surface | EventKind::Collision | EventKind::Unknown
            )
        {
            debug!(nps, time = origin.time, "track continues after multiplying reaction");
            self.open(origin, origin);
        }

        match kind {
            EventKind::Source | EventKind::SpontaneousBank => {
                self.close_interrupted(nps)?;
                if self.tree.is_none() {
                    let root = NeutronHistory::spontaneous_fission_source(
                        nps,
                        event.position,
                        event.time,
                    );
                    self.tree = Some(FissionChainTree::new(root, self.config.parent_lookup));
                }
                let creation = Vertex::at_event(Reaction::SpontaneousFission, event);
                self.open(creation, creation);
            }
            EventKind::InducedBank => {
                self.close_interrupted(nps)?;
                // resolved from the parent on insertion
                let creation = Vertex::at_event(Reaction::Escape, event);
                self.open(creation, creation);
            }
            EventKind::Collision => self.observe_collision(nps, event)?,
            EventKind::Surface | EventKind::Unknown => {
                if self.absorbed {
                    warn!(nps, event_code = event.event_code, "event after capture ignored");
                } else if let Some(segment) = self.segment.as_mut() {
                    segment.last_seen = Vertex::at_event(Reaction::Escape, event);
                }
            }
            EventKind::Terminal => {
                if let Some(segment) = self.segment.take() {
                    let destruction = Vertex::at_event(Reaction::Escape, event);
                    self.insert(nps, segment.creation, destruction)?;
                }
                self.absorbed = false;
            }
            EventKind::EndOfHistory => {}
        }
        Ok(())
    }

    fn observe_collision(&mut self, nps: i64, event: &Event) -> PtracResult<()> {
        if self.absorbed {
            warn!(nps, time = event.time, "collision after capture ignored");
            return Ok(());
        }
        let Some(segment) = self.segment.as_mut() else {
            debug!(nps, time = event.time, "collision outside a tracked neutron");
            return Ok(());
        };
        segment.last_seen = Vertex::at_event(Reaction::Escape, event);

        let Some(collision) = event.collision else {
            warn!(nps, time = event.time, "collision line without nuclide/reaction fields");
            return Ok(());
        };

        match self.config.reactions.classify(collision) {
            CollisionOutcome::Reaction(reaction) => {
                let destruction = Vertex::at_event(reaction, event);
                if let Some(segment) = self.segment.take() {
                    self.insert(nps, segment.creation, destruction)?;
                }
                if reaction.is_multiplying() {
                    self.continuation = Some(destruction);
                } else {
                    self.absorbed = true;
                }
            }
            CollisionOutcome::Scatter => {}
            CollisionOutcome::UnexpectedNuclide => {
                warn!(
                    nps,
                    nuclide = collision.nuclide,
                    mt = collision.reaction,
                    cell = event.cell_id,
                    "collision on unexpected nuclide"
                );
            }
        }
        Ok(())
    }

    fn open(&mut self, creation: Vertex, last_seen: Vertex) {
        self.absorbed = false;
        self.continuation = None;
        self.segment = Some(OpenSegment {
            creation,
            last_seen,
        });
    }

    /// Ends a segment whose terminal event never arrived.
    fn close_interrupted(&mut self, nps: i64) -> PtracResult<()> {
        let Some(segment) = self.segment.take() else {
            return Ok(());
        };
        warn!(
            nps,
            time = segment.last_seen.time,
            "neutron track ended without a terminal event"
        );
        let destruction = Vertex {
            reaction: Reaction::Escape,
            ..segment.last_seen
        };
        self.insert(nps, segment.creation, destruction)
    }

    fn insert(&mut self, nps: i64, creation: Vertex, destruction: Vertex) -> PtracResult<()> {
        let Some(tree) = self.tree.as_mut() else {
            return Err(PtracError::OrphanNeutron {
                nps,
                creation_time: creation.time,
                creation_position: creation.position,
            });
        };
        tree.insert(nps, creation, destruction)?;
        Ok(())
    }

    /// Closes any open segment and hands back the tree, if a source event
    /// was seen.
    pub fn finish(mut self) -> PtracResult<Option<FissionChainTree>> {
        if let Some(nps) = self.nps {
            self.close_interrupted(nps)?;
        }
        Ok(self.tree)
    }
}

/// Reconstructs the fission chain of one decoded history.
pub fn build_fission_chain(
    history: &NpsHistory,
    config: &FormatConfig,
) -> PtracResult<FissionChainTree> {
    let mut builder = ChainBuilder::new(config);
    for event in history.events() {
        builder.observe(event)?;
    }
    builder.finish()?.ok_or_else(|| PtracError::ProtocolViolation {
        nps: history.nps,
        event_code: history
            .events()
            .next()
            .map(|event| event.event_code)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ChainBuilder, build_fission_chain};
    use crate::chain::NodeId;
    use crate::domain::{
        CollisionData, Event, NpsHistory, ParticleHistory, PtracErrorKind, Reaction,
    };
    use crate::format::FormatConfig;

    fn event(code: i64, position: [f64; 3], time: f64) -> Event {
        Event {
            particle_id: 5,
            event_code: code,
            cell_id: 602,
            position,
            energy: 2.0,
            weight: 1.0,
            time,
            collision: None,
        }
    }

    fn collision(position: [f64; 3], time: f64, nuclide: i64, mt: i64) -> Event {
        Event {
            collision: Some(CollisionData {
                nuclide,
                reaction: mt,
            }),
            ..event(4000, position, time)
        }
    }

    fn history(particles: Vec<Vec<Event>>) -> NpsHistory {
        NpsHistory::new(5, particles.into_iter().map(ParticleHistory::new).collect())
    }

    const ORIGIN: [f64; 3] = [0.0, 0.0, 0.0];
    const SITE: [f64; 3] = [1.25, -0.5, 3.0];

    #[test]
    fn induced_fission_spawns_children_at_the_collision() {
        let history = history(vec![
            vec![
                event(2030, ORIGIN, 0.0),
                collision([0.5, 0.0, 0.0], 1.0, 1001, 2),
                collision(SITE, 4.0, 98252, 18),
                event(5000, SITE, 4.0),
            ],
            vec![event(2030, ORIGIN, 0.0), event(5000, [9.0, 0.0, 0.0], 6.0)],
            vec![event(2007, SITE, 4.0), event(5000, [2.0, 2.0, 2.0], 8.0)],
            vec![
                event(2007, SITE, 4.0),
                collision([3.0, 3.0, 3.0], 9.0, 1001, 102),
                event(5000, [3.0, 3.0, 3.0], 9.0),
            ],
        ]);

        let tree = build_fission_chain(&history, &FormatConfig::default())
            .expect("chain should build");
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.multiplicity(NodeId::ROOT), 2);

        let fissioned = tree.children(NodeId::ROOT)[0];
        let neutron = tree.neutron(fissioned);
        assert_eq!(neutron.destruction.reaction, Reaction::InducedFission);
        assert_eq!(neutron.destruction.position, SITE);
        assert_eq!(tree.multiplicity(fissioned), 2);

        let captured = tree.children(fissioned)[1];
        assert_eq!(
            tree.neutron(captured).destruction.reaction,
            Reaction::H1Capture
        );
        assert_eq!(
            tree.neutron(captured).creation.map(|c| c.reaction),
            Some(Reaction::InducedFission)
        );

        let escaped = tree.children(NodeId::ROOT)[1];
        assert_eq!(tree.neutron(escaped).destruction.reaction, Reaction::Escape);
        assert_eq!(tree.neutron(escaped).survival_time(), Some(6.0));
    }

    #[test]
    fn track_continuing_after_n2n_becomes_a_new_neutron() {
        let history = history(vec![
            vec![
                event(2030, ORIGIN, 0.0),
                collision(SITE, 2.0, 98252, 16),
                event(3000, [4.0, 0.0, 0.0], 3.0),
                event(5000, [5.0, 0.0, 0.0], 3.5),
            ],
            vec![event(2007, SITE, 2.0), event(5000, [6.0, 0.0, 0.0], 4.0)],
        ]);

        let tree = build_fission_chain(&history, &FormatConfig::default())
            .expect("chain should build");
        let n2n = tree.children(NodeId::ROOT)[0];
        assert_eq!(tree.neutron(n2n).destruction.reaction, Reaction::N2n);
        assert_eq!(tree.multiplicity(n2n), 2);
        for &child in tree.children(n2n) {
            let creation = tree.neutron(child).creation.expect("child has creation");
            assert_eq!(creation.reaction, Reaction::N2n);
            assert_eq!(creation.time, 2.0);
        }
    }

    #[test]
    fn terminal_right_after_fission_adds_no_continuation() {
        let history = history(vec![vec![
            event(2030, ORIGIN, 0.0),
            collision(SITE, 2.0, 98252, 18),
            event(5000, SITE, 2.0),
        ]]);
        let tree = build_fission_chain(&history, &FormatConfig::default())
            .expect("chain should build");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn orphan_is_reported_not_dropped() {
        let history = history(vec![
            vec![event(2030, ORIGIN, 0.0), event(5000, SITE, 1.0)],
            vec![event(2007, [7.0, 7.0, 7.0], 3.0), event(5000, SITE, 4.0)],
        ]);
        let error = build_fission_chain(&history, &FormatConfig::default())
            .expect_err("no parent destroyed at t=3");
        assert_eq!(error.kind(), PtracErrorKind::OrphanNeutron);
        assert!(error.is_recoverable());
    }

    #[test]
    fn unterminated_track_is_closed_at_its_last_event() {
        let config = FormatConfig::default();
        let mut builder = ChainBuilder::new(&config);
        builder
            .observe(&event(2030, ORIGIN, 0.0))
            .expect("source event");
        builder
            .observe(&event(3000, SITE, 1.5))
            .expect("surface crossing");
        let tree = builder
            .finish()
            .expect("closing succeeds")
            .expect("tree exists after a source event");

        let only = tree.children(NodeId::ROOT)[0];
        assert_eq!(tree.neutron(only).destruction.time, 1.5);
        assert_eq!(tree.neutron(only).destruction.reaction, Reaction::Escape);
    }

    #[test]
    fn empty_history_has_no_chain() {
        let error = build_fission_chain(&history(Vec::new()), &FormatConfig::default())
            .expect_err("nothing to build from");
        assert_eq!(error.kind(), PtracErrorKind::ProtocolViolation);
    }
}
