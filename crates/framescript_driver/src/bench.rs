// SPDX-License-Identifier: MIT OR Apache-2.0
//! Benchmark scene: one duration-aware clip driving parallel eased branches.

use framescript_scene::{AnimationProps, ClipProps, NodeId, NodeKind, Result, Scene};
use framescript_timeline::{Easing, SequenceContext, Variable};

/// Easing used by each branch, in branch order
pub const BRANCH_EASINGS: [Easing; 6] = [
    Easing::EaseIn,
    Easing::EaseOut,
    Easing::EaseInOut,
    Easing::EaseInCubic,
    Easing::EaseOutBack,
    Easing::Linear,
];

/// Benchmark shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchConfig {
    /// Length of one back-and-forth leg in seconds
    pub cycle_seconds: f64,
    /// Number of legs
    pub cycles: usize,
    /// Value every branch moves toward on even legs
    pub peak: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            cycle_seconds: 2.0,
            cycles: 60,
            peak: 100.0,
        }
    }
}

/// Handles into a mounted benchmark scene
#[derive(Debug, Clone)]
pub struct BenchScene {
    /// Top-level clip
    pub clip: NodeId,
    /// Animation node
    pub animation: NodeId,
    /// One variable per branch, in [`BRANCH_EASINGS`] order
    pub variables: Vec<Variable>,
}

/// Mount the benchmark under `parent`
pub fn mount_bench(scene: &mut Scene, parent: Option<NodeId>, config: BenchConfig) -> Result<BenchScene> {
    let variables: Vec<Variable> = (0..BRANCH_EASINGS.len())
        .map(|branch| Variable::new(branch as f64 * 10.0))
        .collect();

    let clip = scene.mount(
        parent,
        NodeKind::Clip(ClipProps::auto(0).with_label("benchmark")),
    )?;

    let branches = variables.clone();
    let body = move |ctx: &mut SequenceContext<'_>| {
        let leg = ctx.seconds(config.cycle_seconds);
        for cycle in 0..config.cycles {
            let target = if cycle % 2 == 0 { config.peak } else { 0.0 };
            let mut handles = Vec::with_capacity(branches.len());
            for (variable, easing) in branches.iter().zip(BRANCH_EASINGS) {
                handles.push(ctx.animate(variable).with_easing(easing).to(target, leg)?);
            }
            ctx.parallel(&handles);
        }
        Ok(())
    };
    let animation = scene.mount(
        Some(clip),
        NodeKind::Animation(AnimationProps::new(body).with_label("branches")),
    )?;

    tracing::debug!(
        "Mounted benchmark: {} branches, {} frames",
        variables.len(),
        scene.total_duration()
    );

    Ok(BenchScene {
        clip,
        animation,
        variables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use framescript_timeline::{ProjectContext, VariableValue};

    #[test]
    fn test_bench_duration() {
        let mut scene = Scene::new(ProjectContext::default());
        let bench = mount_bench(&mut scene, None, BenchConfig::default()).unwrap();

        assert_eq!(scene.total_duration(), 7200);
        assert_eq!(
            scene.sample(bench.animation, &bench.variables[0], 0).unwrap(),
            VariableValue::Number(0.0)
        );
        assert_eq!(
            scene.sample(bench.animation, &bench.variables[0], 119).unwrap(),
            VariableValue::Number(100.0)
        );
        assert_eq!(
            scene.sample(bench.animation, &bench.variables[0], 239).unwrap(),
            VariableValue::Number(0.0)
        );
    }

    #[test]
    fn test_short_bench() {
        let mut scene = Scene::new(ProjectContext::default());
        let config = BenchConfig {
            cycle_seconds: 0.5,
            cycles: 4,
            peak: 1.0,
        };
        let bench = mount_bench(&mut scene, None, config).unwrap();

        assert_eq!(scene.total_duration(), 120);
        assert_eq!(scene.capture(60).samples.len(), bench.variables.len());
    }
}
