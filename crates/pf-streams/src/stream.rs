//! Immutable stream values and blending.

use crate::analyte::{Analyte, StreamClass};
use crate::error::{StreamError, StreamResult};
use crate::units::{FlowUnit, convert};
use pf_core::numeric::EPSILON_FLOW;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value/unit pair for parameters outside the closed analyte set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measured {
    pub value: f64,
    pub unit: String,
}

impl Measured {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// A flow of liquid, gas or solids.
///
/// Streams are values: every method that "changes" a stream returns a new one.
/// The flow is always in the canonical unit of the class (see [`StreamClass::canonical_unit`]).
/// Deserialised streams pass through the same checks as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StreamRecord")]
pub struct Stream {
    class: StreamClass,
    flow: f64,
    flow_unit: FlowUnit,
    values: BTreeMap<Analyte, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    additional: BTreeMap<String, Measured>,
}

/// Wire form of a [`Stream`].
#[derive(Deserialize)]
struct StreamRecord {
    class: StreamClass,
    flow: f64,
    #[serde(default)]
    flow_unit: Option<FlowUnit>,
    #[serde(default)]
    values: BTreeMap<Analyte, f64>,
    #[serde(default)]
    additional: BTreeMap<String, Measured>,
}

impl TryFrom<StreamRecord> for Stream {
    type Error = StreamError;

    fn try_from(record: StreamRecord) -> StreamResult<Self> {
        let canonical = record.class.canonical_unit();
        let flow = match record.flow_unit {
            Some(unit) => convert(record.flow, unit, canonical)?,
            None => record.flow,
        };
        let mut stream = Stream::new(record.class, flow)?.with_values(record.values)?;
        stream.additional = record.additional;
        Ok(stream)
    }
}

impl Stream {
    /// Create an empty stream (no analytes) with a canonical flow.
    pub fn new(class: StreamClass, flow: f64) -> StreamResult<Self> {
        check_non_negative(flow, "flow")?;
        Ok(Self {
            class,
            flow,
            flow_unit: class.canonical_unit(),
            values: BTreeMap::new(),
            additional: BTreeMap::new(),
        })
    }

    /// Liquid stream, flow in m³/d.
    pub fn liquid(flow_m3_per_day: f64) -> StreamResult<Self> {
        Self::new(StreamClass::Liquid, flow_m3_per_day)
    }

    /// Gas stream, flow in Nm³/d.
    pub fn gas(flow_nm3_per_day: f64) -> StreamResult<Self> {
        Self::new(StreamClass::Gas, flow_nm3_per_day)
    }

    /// Solids stream, wet mass flow in kg/d.
    pub fn solids(wet_kg_per_day: f64) -> StreamResult<Self> {
        Self::new(StreamClass::Solids, wet_kg_per_day)
    }

    /// Zero-flow placeholder used before a stage has been evaluated.
    pub fn empty(class: StreamClass) -> Self {
        Self {
            class,
            flow: 0.0,
            flow_unit: class.canonical_unit(),
            values: BTreeMap::new(),
            additional: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> StreamClass {
        self.class
    }

    pub fn flow(&self) -> f64 {
        self.flow
    }

    pub fn flow_unit(&self) -> FlowUnit {
        self.flow_unit
    }

    pub fn value(&self, analyte: Analyte) -> Option<f64> {
        self.values.get(&analyte).copied()
    }

    pub fn value_or_zero(&self, analyte: Analyte) -> f64 {
        self.value(analyte).unwrap_or(0.0)
    }

    pub fn values(&self) -> impl Iterator<Item = (Analyte, f64)> + '_ {
        self.values.iter().map(|(a, v)| (*a, *v))
    }

    pub fn additional(&self) -> &BTreeMap<String, Measured> {
        &self.additional
    }

    pub fn is_empty_flow(&self) -> bool {
        self.flow <= EPSILON_FLOW
    }

    /// Return a copy with `analyte` set to `value`.
    pub fn with_value(&self, analyte: Analyte, value: f64) -> StreamResult<Self> {
        if analyte.class() != self.class {
            return Err(StreamError::ClassMismatch {
                analyte,
                expected: analyte.class(),
                found: self.class,
            });
        }
        check_non_negative(value, analyte.key())?;
        let mut next = self.clone();
        next.values.insert(analyte, value);
        next.check_composition()?;
        Ok(next)
    }

    /// Return a copy with several analytes set.
    pub fn with_values(
        &self,
        values: impl IntoIterator<Item = (Analyte, f64)>,
    ) -> StreamResult<Self> {
        values
            .into_iter()
            .try_fold(self.clone(), |s, (a, v)| s.with_value(a, v))
    }

    pub fn with_additional(&self, name: impl Into<String>, measured: Measured) -> Self {
        let mut next = self.clone();
        next.additional.insert(name.into(), measured);
        next
    }

    pub fn without(&self, analyte: Analyte) -> Self {
        let mut next = self.clone();
        next.values.remove(&analyte);
        next
    }

    /// Same composition, different flow.
    pub fn with_flow(&self, flow: f64) -> StreamResult<Self> {
        check_non_negative(flow, "flow")?;
        let mut next = self.clone();
        next.flow = flow;
        Ok(next)
    }

    /// Apply `f` to every analyte value.
    pub fn mapped(&self, f: impl Fn(Analyte, f64) -> f64) -> StreamResult<Self> {
        let mut next = self.clone();
        for (analyte, value) in next.values.iter_mut() {
            let v = f(*analyte, *value);
            check_non_negative(v, analyte.key())?;
            *value = v;
        }
        next.check_composition()?;
        Ok(next)
    }

    /// Mass load of an analyte in kg/d.
    ///
    /// Liquid concentrations are multiplied by flow; solids loads are returned as-is.
    /// Gas species and ratios have no mass load.
    pub fn load_kg_per_day(&self, analyte: Analyte) -> Option<f64> {
        let v = self.value(analyte)?;
        match self.class {
            StreamClass::Liquid => Some(v * self.flow / 1_000.0),
            StreamClass::Solids if analyte.is_solids_load() => Some(v),
            _ => None,
        }
    }

    /// Sum of volume-percent gas species.
    pub fn gas_percent_total(&self) -> f64 {
        self.values
            .iter()
            .filter(|(a, _)| a.is_gas_percent())
            .map(|(_, v)| *v)
            .sum()
    }

    /// Total solids as a percentage of wet mass.
    pub fn solids_content_pct(&self) -> Option<f64> {
        if self.class != StreamClass::Solids || self.is_empty_flow() {
            return None;
        }
        self.value(Analyte::TotalSolids)
            .map(|ts| 100.0 * ts / self.flow)
    }

    /// Blend extra flow and mass loads into a liquid stream.
    ///
    /// Concentrations follow the mass balance `(Q·C + L) / (Q + q)`.
    pub fn with_recycled_loads(
        &self,
        extra_flow: f64,
        loads_kg_per_day: &BTreeMap<Analyte, f64>,
    ) -> StreamResult<Self> {
        if self.class != StreamClass::Liquid {
            return Err(StreamError::IncompatibleStreams {
                left: self.class,
                right: StreamClass::Liquid,
            });
        }
        check_non_negative(extra_flow, "recycle flow")?;
        let total_flow = self.flow + extra_flow;
        if total_flow <= EPSILON_FLOW {
            return Ok(self.clone());
        }

        let mut next = self.with_flow(total_flow)?;
        let mut analytes: Vec<Analyte> = self.values.keys().copied().collect();
        analytes.extend(loads_kg_per_day.keys().copied());
        analytes.sort();
        analytes.dedup();

        for analyte in analytes {
            let base = self.load_kg_per_day(analyte).unwrap_or(0.0);
            let added = loads_kg_per_day.get(&analyte).copied().unwrap_or(0.0);
            let conc = (base + added) * 1_000.0 / total_flow;
            next = next.with_value(analyte, conc)?;
        }
        Ok(next)
    }

    fn check_composition(&self) -> StreamResult<()> {
        if self.class == StreamClass::Gas {
            let total = self.gas_percent_total();
            // tolerate rounding in reported analyses
            if total > 100.0 + 1e-6 {
                return Err(StreamError::CompositionExceeded { total });
            }
        }
        Ok(())
    }
}

fn check_non_negative(value: f64, what: &str) -> StreamResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(StreamError::NonPhysical {
            what: format!("{what} = {value}"),
        });
    }
    Ok(())
}

/// Combine streams of one class into a single stream.
///
/// - liquid: flows and analyte loads add; a stream that does not report an
///   analyte carries none of it
/// - gas: flows add, composition is flow-weighted over the streams reporting it
/// - solids: wet mass and solids loads add, C:N is weighted by volatile-solids load
pub fn blend(streams: &[Stream]) -> StreamResult<Stream> {
    let first = streams.first().ok_or(StreamError::EmptyBlend)?;
    let class = first.class;
    if let Some(other) = streams.iter().find(|s| s.class != class) {
        return Err(StreamError::IncompatibleStreams {
            left: class,
            right: other.class,
        });
    }

    let total_flow: f64 = streams.iter().map(|s| s.flow).sum();
    let mut out = Stream::new(class, total_flow)?;

    let mut analytes: Vec<Analyte> = streams
        .iter()
        .flat_map(|s| s.values.keys().copied())
        .collect();
    analytes.sort();
    analytes.dedup();

    for analyte in analytes {
        let value = match class {
            StreamClass::Solids if analyte.is_solids_load() => {
                streams.iter().map(|s| s.value_or_zero(analyte)).sum()
            }
            StreamClass::Solids => weighted_mean(streams, analyte, |s| {
                s.value_or_zero(Analyte::VolatileSolids)
            }),
            StreamClass::Liquid if total_flow > EPSILON_FLOW => {
                streams.iter().map(|s| s.flow * s.value_or_zero(analyte)).sum::<f64>() / total_flow
            }
            StreamClass::Liquid | StreamClass::Gas => {
                weighted_mean(streams, analyte, |s| s.flow)
            }
        };
        out = out.with_value(analyte, value)?;
    }

    for s in streams {
        for (name, measured) in &s.additional {
            out.additional
                .entry(name.clone())
                .or_insert_with(|| measured.clone());
        }
    }
    Ok(out)
}

/// Weighted mean over the streams that report `analyte`.
fn weighted_mean(streams: &[Stream], analyte: Analyte, weight: impl Fn(&Stream) -> f64) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;
    for s in streams {
        if let Some(v) = s.value(analyte) {
            let w = weight(s);
            num += w * v;
            den += w;
        }
    }
    if den > EPSILON_FLOW {
        num / den
    } else {
        // no weight information: plain mean of reported values
        let reported: Vec<f64> = streams.iter().filter_map(|s| s.value(analyte)).collect();
        if reported.is_empty() {
            0.0
        } else {
            reported.iter().sum::<f64>() / reported.len() as f64
        }
    }
}
