//! Component D: the bounded, deduplicated, sorted collection of stationary
//! points found so far, plus the binary snapshot codec used to publish and
//! persist it. Grounded on `original_source/hgdl/results.py`'s `Results`
//! class (sorted `minima_x`/`minima_y`, a roll-up/merge step), reshaped
//! into an immutable-snapshot value type the way this codebase favors
//! (`OptimizationRecorder` in `src-de` is the closest analogue: an
//! accumulate-then-read-only-view struct).

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array1;
use std::io::{Cursor, Read, Write};

use crate::bounds::Bounds;
use crate::error::EngineError;
use crate::local::LocalResult;

const MAGIC: &[u8; 4] = b"HGDL";
const CODEC_VERSION: u16 = 1;

/// What kind of stationary point a converged record turned out to be,
/// read off the sign pattern of the Hessian's eigenvalues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    Min,
    Max,
    Saddle,
    /// No Hessian was available, or an eigenvalue was too close to zero
    /// to trust the sign of.
    Unknown,
}

const EIGENVALUE_ZERO_EPS: f64 = 1e-8;

fn classify(eigvals: Option<&Array1<f64>>) -> Classifier {
    match eigvals {
        None => Classifier::Unknown,
        Some(ev) => {
            if ev.iter().any(|&lambda| lambda.abs() < EIGENVALUE_ZERO_EPS) {
                return Classifier::Unknown;
            }
            let all_pos = ev.iter().all(|&lambda| lambda > 0.0);
            let all_neg = ev.iter().all(|&lambda| lambda < 0.0);
            if all_pos {
                Classifier::Min
            } else if all_neg {
                Classifier::Max
            } else {
                Classifier::Saddle
            }
        }
    }
}

/// One converged (or not) local search result, with its classification.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimumRecord {
    pub x: Array1<f64>,
    pub f_val: f64,
    pub grad_norm: f64,
    pub eigvals: Option<Array1<f64>>,
    pub classifier: Classifier,
    pub success: bool,
}

impl OptimumRecord {
    pub fn from_local_result(result: LocalResult) -> Self {
        let classifier = classify(result.eigvals.as_ref());
        Self {
            x: result.x,
            f_val: result.f_val,
            grad_norm: result.grad_norm,
            eigvals: result.eigvals,
            classifier,
            success: result.success,
        }
    }
}

/// The store itself: records are kept sorted ascending by `f_val`,
/// deduplicated within `r_merge`, and truncated to `n_max`.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimaStore {
    records: Vec<OptimumRecord>,
    n_max: usize,
    r_merge: f64,
}

impl OptimaStore {
    pub fn new(n_max: usize, r_merge: f64) -> Self {
        Self {
            records: Vec::new(),
            n_max,
            r_merge,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[OptimumRecord] {
        &self.records
    }

    /// Folds a batch of fresh local results in: failures and out-of-box
    /// points are dropped, points within `r_merge` of an existing record
    /// are treated as rediscoveries of the same point, and the store is
    /// truncated back to `n_max` entries (best `f_val` first) afterwards.
    pub fn merge(&mut self, candidates: impl IntoIterator<Item = OptimumRecord>, bounds: &Bounds) {
        for candidate in candidates {
            if !candidate.success || !bounds.in_box(&candidate.x) {
                continue;
            }
            let is_duplicate = self.records.iter().any(|existing| {
                let diff = &existing.x - &candidate.x;
                diff.mapv(|v| v * v).sum().sqrt() <= self.r_merge
            });
            if is_duplicate {
                continue;
            }
            let pos = self.records.partition_point(|e| e.f_val < candidate.f_val);
            self.records.insert(pos, candidate);
        }
        if self.records.len() > self.n_max {
            self.records.truncate(self.n_max);
        }
    }

    /// Current deflation set: every recorded point's location.
    pub fn deflation_points(&self) -> Vec<Array1<f64>> {
        self.records.iter().map(|r| r.x.clone()).collect()
    }

    /// Best `k` records (or all of them, if fewer than `k` are known).
    pub fn top_k(&self, k: usize) -> Vec<OptimumRecord> {
        self.records.iter().take(k).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptimumRecord> {
        self.records.iter()
    }

    /// Encodes the store into the little-endian binary snapshot format:
    /// `[b"HGDL", u16 version, u64 n_max, f64 r_merge, u32 record_count]`
    /// followed by each record as `[u32 dim, f64xdim x, f64 f_val, f64
    /// grad_norm, u8 has_eigvals, (u32 dim, f64xdim eigvals)?, u8
    /// classifier_tag, u8 success]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_all(MAGIC).expect("writing to a Vec never fails");
        buf.write_u16::<LittleEndian>(CODEC_VERSION).unwrap();
        buf.write_u64::<LittleEndian>(self.n_max as u64).unwrap();
        buf.write_f64::<LittleEndian>(self.r_merge).unwrap();
        buf.write_u32::<LittleEndian>(self.records.len() as u32).unwrap();
        for record in &self.records {
            write_vec(&mut buf, &record.x);
            buf.write_f64::<LittleEndian>(record.f_val).unwrap();
            buf.write_f64::<LittleEndian>(record.grad_norm).unwrap();
            match &record.eigvals {
                Some(ev) => {
                    buf.write_u8(1).unwrap();
                    write_vec(&mut buf, ev);
                }
                None => buf.write_u8(0).unwrap(),
            }
            buf.write_u8(classifier_tag(record.classifier)).unwrap();
            buf.write_u8(record.success as u8).unwrap();
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut cur = Cursor::new(bytes);
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic).map_err(io_err)?;
        if &magic != MAGIC {
            return Err(EngineError::Codec("bad magic: not an HGDL snapshot".into()));
        }
        let version = cur.read_u16::<LittleEndian>().map_err(io_err)?;
        if version != CODEC_VERSION {
            return Err(EngineError::Codec(format!("unsupported snapshot version {version}")));
        }
        let n_max = cur.read_u64::<LittleEndian>().map_err(io_err)? as usize;
        let r_merge = cur.read_f64::<LittleEndian>().map_err(io_err)?;
        let count = cur.read_u32::<LittleEndian>().map_err(io_err)?;

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let x = read_vec(&mut cur)?;
            let f_val = cur.read_f64::<LittleEndian>().map_err(io_err)?;
            let grad_norm = cur.read_f64::<LittleEndian>().map_err(io_err)?;
            let has_eigvals = cur.read_u8().map_err(io_err)?;
            let eigvals = if has_eigvals == 1 { Some(read_vec(&mut cur)?) } else { None };
            let classifier = classifier_from_tag(cur.read_u8().map_err(io_err)?)?;
            let success = cur.read_u8().map_err(io_err)? != 0;
            records.push(OptimumRecord {
                x,
                f_val,
                grad_norm,
                eigvals,
                classifier,
                success,
            });
        }
        Ok(Self { records, n_max, r_merge })
    }
}

fn io_err(e: std::io::Error) -> EngineError {
    EngineError::Codec(e.to_string())
}

fn write_vec(buf: &mut Vec<u8>, v: &Array1<f64>) {
    buf.write_u32::<LittleEndian>(v.len() as u32).unwrap();
    for &val in v.iter() {
        buf.write_f64::<LittleEndian>(val).unwrap();
    }
}

fn read_vec(cur: &mut Cursor<&[u8]>) -> Result<Array1<f64>, EngineError> {
    let len = cur.read_u32::<LittleEndian>().map_err(io_err)?;
    let mut values = Vec::with_capacity(len as usize);
    for _ in 0..len {
        values.push(cur.read_f64::<LittleEndian>().map_err(io_err)?);
    }
    Ok(Array1::from_vec(values))
}

fn classifier_tag(c: Classifier) -> u8 {
    match c {
        Classifier::Min => 0,
        Classifier::Max => 1,
        Classifier::Saddle => 2,
        Classifier::Unknown => 3,
    }
}

fn classifier_from_tag(tag: u8) -> Result<Classifier, EngineError> {
    match tag {
        0 => Ok(Classifier::Min),
        1 => Ok(Classifier::Max),
        2 => Ok(Classifier::Saddle),
        3 => Ok(Classifier::Unknown),
        other => Err(EngineError::Codec(format!("unknown classifier tag {other}"))),
    }
}
