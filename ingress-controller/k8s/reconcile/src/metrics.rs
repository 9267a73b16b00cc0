use crate::store::{Created, Kind};
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

#[derive(Clone, Debug, Default)]
pub struct Metrics {
    reconciles: Family<StateLabels, Counter>,
    creates: Family<CreateLabels, Counter>,
    errors: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct StateLabels {
    state: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct CreateLabels {
    kind: &'static str,
    result: &'static str,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: &'static str,
}

impl Metrics {
    pub fn register(prom: &mut Registry) -> Self {
        let reconciles = Family::default();
        prom.register(
            "reconciles",
            "Count of reconciliations by the observed state",
            reconciles.clone(),
        );

        let creates = Family::default();
        prom.register(
            "creates",
            "Count of create requests by object kind and result",
            creates.clone(),
        );

        let errors = Family::default();
        prom.register(
            "store_errors",
            "Count of failed store requests by object kind",
            errors.clone(),
        );

        Self {
            reconciles,
            creates,
            errors,
        }
    }

    pub(crate) fn observed(&self, state: &'static str) {
        self.reconciles.get_or_create(&StateLabels { state }).inc();
    }

    pub(crate) fn created(&self, kind: Kind, created: Created) {
        self.creates
            .get_or_create(&CreateLabels {
                kind: kind.as_str(),
                result: created.as_str(),
            })
            .inc();
    }

    pub(crate) fn store_error(&self, kind: Kind) {
        self.errors
            .get_or_create(&KindLabels {
                kind: kind.as_str(),
            })
            .inc();
    }

    #[cfg(test)]
    pub(crate) fn creates(&self, kind: Kind, created: Created) -> u64 {
        self.creates
            .get_or_create(&CreateLabels {
                kind: kind.as_str(),
                result: created.as_str(),
            })
            .get()
    }

    #[cfg(test)]
    pub(crate) fn store_errors(&self, kind: Kind) -> u64 {
        self.errors
            .get_or_create(&KindLabels {
                kind: kind.as_str(),
            })
            .get()
    }
}
