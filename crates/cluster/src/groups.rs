//! Series grouped by cluster label, ready for plotting.

use std::collections::BTreeMap;

use crate::barycenter::euclidean_barycenter;

/// Vertical plot range for normalized series.
pub const Y_RANGE: (f64, f64) = (-4.0, 4.0);

/// Opacity used when drawing member series.
pub const MEMBER_ALPHA: f64 = 0.2;

/// One cluster and the rows assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterGroup {
    /// Cluster label (`-1` for noise).
    pub label: i32,
    /// Indices of member rows in the input.
    pub members: Vec<usize>,
    /// Pointwise mean of the member series.
    pub mean: Vec<f64>,
}

impl ClusterGroup {
    /// Panel annotation, numbered from one.
    pub fn annotation(&self) -> String {
        format!("Cluster {}", self.label + 1)
    }

    /// Member series borrowed from `rows`.
    pub fn series<'a>(&'a self, rows: &'a [Vec<f64>]) -> impl Iterator<Item = &'a [f64]> + 'a {
        self.members
            .iter()
            .filter_map(move |&i| rows.get(i).map(|r| r.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// All clusters of a labelling, ordered by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterGroups {
    groups: Vec<ClusterGroup>,
}

impl ClusterGroups {
    /// Group `rows` by `labels`. Extra rows or labels beyond the shorter of the
    /// two are ignored.
    pub fn new(labels: &[i32], rows: &[Vec<f64>]) -> Self {
        let mut by_label: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        for (i, &label) in labels.iter().enumerate().take(rows.len()) {
            by_label.entry(label).or_default().push(i);
        }

        let groups = by_label
            .into_iter()
            .map(|(label, members)| {
                let series: Vec<&[f64]> = members.iter().map(|&i| rows[i].as_slice()).collect();
                ClusterGroup {
                    label,
                    mean: euclidean_barycenter(&series),
                    members,
                }
            })
            .collect();

        Self { groups }
    }

    /// Groups ordered by label.
    pub fn groups(&self) -> &[ClusterGroup] {
        &self.groups
    }

    /// Group with the given label.
    pub fn get(&self, label: i32) -> Option<&ClusterGroup> {
        self.groups.iter().find(|g| g.label == label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClusterGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_vec(self) -> Vec<ClusterGroup> {
        self.groups
    }
}

impl<'a> IntoIterator for &'a ClusterGroups {
    type Item = &'a ClusterGroup;
    type IntoIter = std::slice::Iter<'a, ClusterGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}
