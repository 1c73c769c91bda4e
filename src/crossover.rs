//! Crossover: sending the rate a consumer cannot handle on to another consumer.
//!
//! Crossover relations between the consumers of a system form a directed graph, which is sorted
//! topologically so that every consumer is evaluated after all the consumers sending rate to it.
use crate::consumer::ConsumerID;
use crate::id::IDCollection;
use crate::time_series::TimeSeries;
use anyhow::{Context, Result, anyhow, ensure};
use indexmap::IndexSet;
use petgraph::Directed;
use petgraph::algo::toposort;
use petgraph::graph::{Graph, NodeIndex};
use serde::Deserialize;

/// A graph of crossover relations, with one node per consumer
type CrossoverGraphInner = Graph<ConsumerID, (), Directed>;

/// A relation sending excess rate from one consumer to another
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Crossover {
    /// The consumer whose excess rate is sent on
    pub from: ConsumerID,
    /// The consumer receiving the excess rate
    pub to: ConsumerID,
}

impl Crossover {
    /// Create a new crossover relation
    pub fn new(from: ConsumerID, to: ConsumerID) -> Self {
        Self { from, to }
    }
}

/// Crossover relations resolved against the consumers of a system
#[derive(Debug, Clone, PartialEq)]
pub struct CrossoverGraph {
    /// Consumer indices in evaluation order
    order: Vec<usize>,
    /// The consumer (if any) receiving each consumer's excess rate
    targets: Vec<Option<usize>>,
}

impl CrossoverGraph {
    /// Build and check the crossover graph for the given consumers.
    ///
    /// Each consumer may send its excess rate to at most one other consumer, but may receive rate
    /// from any number of consumers. The relations must not form a cycle.
    pub fn new(consumer_ids: &IndexSet<ConsumerID>, crossover: &[Crossover]) -> Result<Self> {
        let mut graph = CrossoverGraphInner::new();
        for id in consumer_ids {
            graph.add_node(id.clone());
        }

        let mut targets = vec![None; consumer_ids.len()];
        for relation in crossover {
            let from = consumer_ids
                .get_index_by_str(&relation.from.0)
                .context("Crossover from unknown consumer")?;
            let to = consumer_ids
                .get_index_by_str(&relation.to.0)
                .context("Crossover to unknown consumer")?;
            ensure!(
                from != to,
                "Consumer {} cannot send crossover to itself",
                relation.from
            );
            ensure!(
                targets[from].replace(to).is_none(),
                "Consumer {} has more than one crossover; only one is supported",
                relation.from
            );
            graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
        }

        let order = topo_sort_consumers(&graph)?;

        Ok(Self { order, targets })
    }

    /// Consumer indices in an order where every consumer comes after those sending rate to it
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// The consumer receiving the excess rate of the given consumer, if any
    pub fn target(&self, consumer_index: usize) -> Option<usize> {
        self.targets[consumer_index]
    }
}

/// Topologically sort the crossover graph, returning consumer indices.
///
/// The sort is deterministic for a given order of consumers and relations.
fn topo_sort_consumers(graph: &CrossoverGraphInner) -> Result<Vec<usize>> {
    let order = toposort(graph, None).map_err(|cycle| {
        let consumer_id = &graph[cycle.node_id()];
        anyhow!("Cycle detected in crossover graph for consumer {consumer_id}")
    })?;

    Ok(order.into_iter().map(NodeIndex::index).collect())
}

/// Split a consumer's inlet rates into the rate within its capacity and the excess rate.
///
/// Returns the excess rate (to be sent on to another consumer) and the inlet rates reduced so
/// that their total does not exceed `max_rate`, in their original order.
///
/// The reduction is taken from the last inlet rates first. Inlet rates begin with the consumer's
/// own requested rate, followed by rates received from other consumers, so rate which has already
/// been sent on once is the first to be passed along again. Rates which are zero or negative are
/// never reduced.
pub fn get_crossover_rates(
    max_rate: &TimeSeries<f64>,
    inlet_rates: &[TimeSeries<f64>],
) -> (TimeSeries<f64>, Vec<TimeSeries<f64>>) {
    let total_rate = inlet_rates.iter().fold(
        TimeSeries::filled(max_rate.timesteps(), 0.0),
        |total, rate| &total + rate,
    );
    let excess_rate = total_rate.zip_with(max_rate, |&total, &max| {
        if total > max { total - max } else { 0.0 }
    });

    let mut left_over = excess_rate.clone();
    let mut rates_within_capacity: Vec<_> = inlet_rates
        .iter()
        .rev()
        .map(|rate| {
            let reduced = rate.zip_with(&left_over, |&rate, &excess| reduce_rate(rate, excess));
            left_over = reduced.map(|&(_, excess)| excess);
            reduced.map(|&(rate, _)| rate)
        })
        .collect();
    rates_within_capacity.reverse();

    (excess_rate, rates_within_capacity)
}

/// Take as much of `excess` as possible out of `rate`, returning the reduced rate and the excess
/// still to be taken from other rates
fn reduce_rate(rate: f64, excess: f64) -> (f64, f64) {
    if excess <= 0.0 || rate <= 0.0 {
        (rate, excess)
    } else if rate >= excess {
        (rate - excess, 0.0)
    } else {
        (0.0, excess - rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, timesteps};
    use crate::time_series::Timestep;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn ids(names: &[&str]) -> IndexSet<ConsumerID> {
        names.iter().map(|&name| name.into()).collect()
    }

    fn crossover(relations: &[(&str, &str)]) -> Vec<Crossover> {
        relations
            .iter()
            .map(|&(from, to)| Crossover::new(from.into(), to.into()))
            .collect()
    }

    fn series(timesteps: &[Timestep], values: &[f64]) -> TimeSeries<f64> {
        TimeSeries::new(timesteps.to_vec(), values.to_vec()).unwrap()
    }

    /// Check that every relation's source comes before its target
    fn assert_sorted(graph: &CrossoverGraph, consumer_ids: &IndexSet<ConsumerID>) {
        let position = |index| graph.order().iter().position(|&i| i == index).unwrap();
        assert_eq!(graph.order().len(), consumer_ids.len());
        for from in 0..consumer_ids.len() {
            if let Some(to) = graph.target(from) {
                assert!(position(from) < position(to));
            }
        }
    }

    #[test]
    fn test_topo_sort_chain() {
        // c -> b -> a, defined in reverse
        let consumer_ids = ids(&["a", "b", "c"]);
        let graph = CrossoverGraph::new(&consumer_ids, &crossover(&[("c", "b"), ("b", "a")]))
            .unwrap();
        assert_eq!(graph.order(), [2, 1, 0]);
        assert_eq!(graph.target(2), Some(1));
        assert_eq!(graph.target(0), None);
    }

    #[test]
    fn test_topo_sort_many_to_one() {
        let consumer_ids = ids(&["a", "b", "c", "d"]);
        let relations = crossover(&[("a", "c"), ("b", "c"), ("c", "d")]);
        let graph = CrossoverGraph::new(&consumer_ids, &relations).unwrap();
        assert_sorted(&graph, &consumer_ids);

        // Same input gives the same order
        assert_eq!(graph, CrossoverGraph::new(&consumer_ids, &relations).unwrap());
    }

    #[test]
    fn test_topo_sort_no_crossover() {
        let consumer_ids = ids(&["a", "b"]);
        let graph = CrossoverGraph::new(&consumer_ids, &[]).unwrap();
        assert_sorted(&graph, &consumer_ids);
        assert_eq!(graph.target(0), None);
        assert_eq!(graph.target(1), None);
    }

    #[test]
    fn test_cycle() {
        let consumer_ids = ids(&["a", "b"]);
        let result = CrossoverGraph::new(&consumer_ids, &crossover(&[("a", "b"), ("b", "a")]));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Cycle detected in crossover graph for consumer")
        );
    }

    #[test]
    fn test_transitive_cycle() {
        let consumer_ids = ids(&["a", "b", "c", "d"]);
        let relations = crossover(&[("a", "b"), ("b", "c"), ("c", "a"), ("d", "a")]);
        assert!(
            CrossoverGraph::new(&consumer_ids, &relations)
                .unwrap_err()
                .to_string()
                .starts_with("Cycle detected in crossover graph for consumer")
        );
    }

    #[test]
    fn test_invalid_relations() {
        let consumer_ids = ids(&["a", "b", "c"]);
        assert_error!(
            CrossoverGraph::new(&consumer_ids, &crossover(&[("a", "a")])),
            "Consumer a cannot send crossover to itself"
        );
        assert_error!(
            CrossoverGraph::new(&consumer_ids, &crossover(&[("a", "b"), ("a", "c")])),
            "Consumer a has more than one crossover; only one is supported"
        );
        assert_error!(
            CrossoverGraph::new(&consumer_ids, &crossover(&[("x", "b")])),
            "Crossover from unknown consumer"
        );
        assert_error!(
            CrossoverGraph::new(&consumer_ids, &crossover(&[("a", "x")])),
            "Crossover to unknown consumer"
        );
    }

    #[rstest]
    fn test_get_crossover_rates_over_capacity(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let requested = series(&timesteps, &[5.0, 12.0, 8.0, 20.0]);

        let (excess, within) = get_crossover_rates(&max_rate, &[requested]);
        assert_eq!(excess.values(), [0.0, 2.0, 0.0, 10.0]);
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].values(), [5.0, 10.0, 8.0, 10.0]);
    }

    #[rstest]
    fn test_get_crossover_rates_within_capacity(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let inlet_rates = [
            series(&timesteps, &[1.0, 2.0, 3.0, 0.0]),
            series(&timesteps, &[4.0, 0.0, 7.0, 10.0]),
        ];

        let (excess, within) = get_crossover_rates(&max_rate, &inlet_rates);
        assert_eq!(excess.values(), [0.0; 4]);
        assert_eq!(within, inlet_rates);
    }

    #[rstest]
    fn test_get_crossover_rates_received_rate_reduced_first(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let own = series(&timesteps, &[8.0, 8.0, 8.0, 12.0]);
        let received = series(&timesteps, &[1.0, 3.0, 6.0, 5.0]);

        let (excess, within) = get_crossover_rates(&max_rate, &[own, received]);
        assert_eq!(excess.values(), [0.0, 1.0, 4.0, 7.0]);
        assert_eq!(within[0].values(), [8.0, 8.0, 8.0, 10.0]);
        assert_eq!(within[1].values(), [1.0, 2.0, 2.0, 0.0]);
    }

    #[rstest]
    fn test_get_crossover_rates_conservation(timesteps: Vec<Timestep>) {
        let max_rate = series(&timesteps, &[3.0, 0.0, 7.5, 100.0]);
        let inlet_rates = [
            series(&timesteps, &[2.5, 1.0, 0.0, 30.0]),
            series(&timesteps, &[0.0, 4.0, 9.0, 40.0]),
            series(&timesteps, &[6.0, 0.5, 1.0, 50.0]),
        ];

        let (excess, within) = get_crossover_rates(&max_rate, &inlet_rates);
        for step in 0..timesteps.len() {
            let original: f64 = inlet_rates.iter().map(|r| r.values()[step]).sum();
            let kept: f64 = within.iter().map(|r| r.values()[step]).sum();
            assert!(excess.values()[step] >= 0.0);
            assert!(within.iter().all(|r| r.values()[step] >= 0.0));
            assert_approx_eq!(f64, kept + excess.values()[step], original);
            assert!(kept <= max_rate.values()[step] + 1e-12);
        }
    }

    #[rstest]
    fn test_get_crossover_rates_negative_rate_within_capacity(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let inlet_rates = [
            TimeSeries::filled(&timesteps, 3.0),
            TimeSeries::filled(&timesteps, -5.0),
        ];

        let (excess, within) = get_crossover_rates(&max_rate, &inlet_rates);
        assert_eq!(excess.values(), [0.0; 4]);
        assert_eq!(within, inlet_rates);
    }

    #[rstest]
    fn test_get_crossover_rates_negative_rate_not_reduced(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let own = series(&timesteps, &[15.0, 15.0, 9.0, 20.0]);
        let received = series(&timesteps, &[-2.0, 0.0, 4.0, -1.0]);

        let (excess, within) = get_crossover_rates(&max_rate, &[own, received.clone()]);
        assert_eq!(excess.values(), [3.0, 5.0, 3.0, 9.0]);
        assert_eq!(within[0].values(), [12.0, 10.0, 9.0, 11.0]);
        assert_eq!(within[1].values(), [-2.0, 0.0, 1.0, -1.0]);
    }

    #[rstest]
    fn test_get_crossover_rates_no_inlets(timesteps: Vec<Timestep>) {
        let max_rate = TimeSeries::filled(&timesteps, 10.0);
        let (excess, within) = get_crossover_rates(&max_rate, &[]);
        assert_eq!(excess.values(), [0.0; 4]);
        assert!(within.is_empty());
    }
}
