//! Data-driven rule tables
//!
//! A [`RuleTable`] is an ordered list of [`RuleGroup`]s. Each group is a ladder
//! of bands over one metric: only the first band whose predicate matches
//! applies. Groups are independent and all of them are evaluated, except that a
//! terminal group which fires becomes the only adjustment.

use crate::models::Adjustment;

type Predicate<M> = Box<dyn Fn(&M) -> bool + Send + Sync>;
type Label<M> = Box<dyn Fn(&M) -> String + Send + Sync>;
type DeltaFn<M> = Box<dyn Fn(&M) -> f64 + Send + Sync>;

pub enum Delta<M> {
    Fixed(f64),
    /// Delta that depends on the metrics (e.g., per-protocol penalties)
    Computed(DeltaFn<M>),
}

/// One band: predicate, label, delta and advice
pub struct Rule<M> {
    id: &'static str,
    when: Predicate<M>,
    delta: Delta<M>,
    label: Label<M>,
    advice: &'static str,
}

impl<M> Rule<M> {
    pub fn new(id: &'static str, when: impl Fn(&M) -> bool + Send + Sync + 'static) -> Self {
        Self {
            id,
            when: Box::new(when),
            delta: Delta::Fixed(0.0),
            label: Box::new(move |_: &M| id.replace('_', " ")),
            advice: "",
        }
    }

    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = Delta::Fixed(delta);
        self
    }

    pub fn delta_with(mut self, delta: impl Fn(&M) -> f64 + Send + Sync + 'static) -> Self {
        self.delta = Delta::Computed(Box::new(delta));
        self
    }

    pub fn label(mut self, label: impl Fn(&M) -> String + Send + Sync + 'static) -> Self {
        self.label = Box::new(label);
        self
    }

    pub fn advice(mut self, advice: &'static str) -> Self {
        self.advice = advice;
        self
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn matches(&self, metrics: &M) -> bool {
        (self.when)(metrics)
    }

    fn apply(&self, metrics: &M) -> Adjustment {
        let delta = match &self.delta {
            Delta::Fixed(d) => *d,
            Delta::Computed(f) => f(metrics),
        };
        Adjustment {
            rule: self.id.to_string(),
            label: (self.label)(metrics),
            delta,
            advice: self.advice.to_string(),
        }
    }
}

pub struct RuleGroup<M> {
    name: &'static str,
    terminal: bool,
    bands: Vec<Rule<M>>,
}

impl<M> RuleGroup<M> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            terminal: false,
            bands: Vec::new(),
        }
    }

    /// A group whose firing short-circuits the rest of the table
    pub fn terminal(name: &'static str) -> Self {
        Self {
            terminal: true,
            ..Self::new(name)
        }
    }

    pub fn band(mut self, rule: Rule<M>) -> Self {
        self.bands.push(rule);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// First matching band, if any
    pub fn select(&self, metrics: &M) -> Option<&Rule<M>> {
        self.bands.iter().find(|rule| rule.matches(metrics))
    }
}

pub struct RuleTable<M> {
    groups: Vec<RuleGroup<M>>,
}

impl<M> Default for RuleTable<M> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<M> RuleTable<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, group: RuleGroup<M>) -> Self {
        self.groups.push(group);
        self
    }

    /// Evaluate every group in order and collect the triggered adjustments.
    ///
    /// Adjustments with a zero delta are dropped: they do not deviate from
    /// the baseline.
    pub fn evaluate(&self, metrics: &M) -> Vec<Adjustment> {
        let mut adjustments = Vec::new();

        for group in &self.groups {
            let Some(rule) = group.select(metrics) else {
                continue;
            };
            tracing::trace!(group = group.name(), band = rule.id(), "Band selected");
            let adjustment = rule.apply(metrics);

            if group.terminal {
                return vec![adjustment];
            }
            if adjustment.delta != 0.0 {
                adjustments.push(adjustment);
            }
        }

        adjustments
    }
}
