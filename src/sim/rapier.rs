//! rapier2d-backed implementation of the simulation seam.
//!
//! Top-down table: zero gravity, perfectly elastic discs slowed by air
//! damping, static border colliders leaving the two goal mouths open.

use rapier2d::math::{Real, Rotation, Vector};
use rapier2d::prelude::*;

use super::{
    starting_pose, Body, Simulation, BALL_DIAMETER, BORDER_SIZE, FIELD_HEIGHT, FIELD_WIDTH,
    GOAL_WIDTH, PLAYER_DIAMETER,
};
use crate::ws::protocol::{Pose, Vec2};

/// Damping standing in for table friction
const AIR_DAMPING: f32 = 0.25;

pub struct RapierSimulation {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    players: [RigidBodyHandle; 2],
    ball: RigidBodyHandle,
}

impl RapierSimulation {
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        build_borders(&mut colliders);

        let players = [
            spawn_disc(
                &mut bodies,
                &mut colliders,
                starting_pose(Body::Player(0)),
                PLAYER_DIAMETER / 2.0,
            ),
            spawn_disc(
                &mut bodies,
                &mut colliders,
                starting_pose(Body::Player(1)),
                PLAYER_DIAMETER / 2.0,
            ),
        ];
        let ball = spawn_disc(
            &mut bodies,
            &mut colliders,
            starting_pose(Body::Ball),
            BALL_DIAMETER / 2.0,
        );

        Self {
            bodies,
            colliders,
            gravity: vector![0.0, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            players,
            ball,
        }
    }

    fn handle_of(&self, body: Body) -> RigidBodyHandle {
        match body {
            Body::Player(i) => self.players[i.min(1)],
            Body::Ball => self.ball,
        }
    }
}

impl Default for RapierSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for RapierSimulation {
    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    fn pose(&self, body: Body) -> Pose {
        let rb = &self.bodies[self.handle_of(body)];
        Pose {
            x: rb.translation().x,
            y: rb.translation().y,
            rot: rb.rotation().angle(),
        }
    }

    fn apply_impulse(&mut self, body: Body, impulse: Vec2) {
        let handle = self.handle_of(body);
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.apply_impulse(vector![impulse.x, impulse.y], true);
        }
    }

    fn is_asleep(&self, body: Body) -> bool {
        self.bodies[self.handle_of(body)].is_sleeping()
    }

    fn place(&mut self, body: Body, pose: Pose) {
        let handle = self.handle_of(body);
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_translation(vector![pose.x, pose.y], false);
            rb.set_rotation(Rotation::new(pose.rot), false);
            rb.set_linvel(vector![0.0, 0.0], false);
            rb.set_angvel(0.0, false);
        }
    }
}

fn spawn_disc(
    bodies: &mut RigidBodySet,
    colliders: &mut ColliderSet,
    pose: Pose,
    radius: f32,
) -> RigidBodyHandle {
    let rb = RigidBodyBuilder::dynamic()
        .translation(vector![pose.x, pose.y])
        .linear_damping(AIR_DAMPING)
        .angular_damping(AIR_DAMPING)
        .build();
    let handle = bodies.insert(rb);
    colliders.insert_with_parent(
        ColliderBuilder::ball(radius)
            .restitution(1.0)
            .friction(0.0)
            .mass(1.0)
            .build(),
        handle,
        bodies,
    );
    handle
}

/// Static field borders as cuboids; the side walls are split so each goal
/// mouth stays open
fn build_borders(colliders: &mut ColliderSet) {
    let goal_top = (FIELD_HEIGHT - GOAL_WIDTH) / 2.0;
    let goal_bottom = (FIELD_HEIGHT + GOAL_WIDTH) / 2.0;
    let side_hy = (goal_top - BORDER_SIZE) / 2.0;

    // (center_x, center_y, half_x, half_y)
    let walls = [
        // top and bottom rails
        (FIELD_WIDTH / 2.0, BORDER_SIZE / 2.0, FIELD_WIDTH / 2.0, BORDER_SIZE / 2.0),
        (
            FIELD_WIDTH / 2.0,
            FIELD_HEIGHT - BORDER_SIZE / 2.0,
            FIELD_WIDTH / 2.0,
            BORDER_SIZE / 2.0,
        ),
        // left wall above and below the goal mouth
        (BORDER_SIZE / 2.0, BORDER_SIZE + side_hy, BORDER_SIZE / 2.0, side_hy),
        (BORDER_SIZE / 2.0, goal_bottom + side_hy, BORDER_SIZE / 2.0, side_hy),
        // right wall above and below the goal mouth
        (
            FIELD_WIDTH - BORDER_SIZE / 2.0,
            BORDER_SIZE + side_hy,
            BORDER_SIZE / 2.0,
            side_hy,
        ),
        (
            FIELD_WIDTH - BORDER_SIZE / 2.0,
            goal_bottom + side_hy,
            BORDER_SIZE / 2.0,
            side_hy,
        ),
    ];

    for (cx, cy, hx, hy) in walls {
        colliders.insert(
            ColliderBuilder::cuboid(hx, hy)
                .translation(vector![cx, cy])
                .restitution(1.0)
                .friction(0.0)
                .build(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_spawn_at_the_starting_layout() {
        let sim = RapierSimulation::new();
        for body in super::super::BODIES {
            let pose = sim.pose(body);
            let start = starting_pose(body);
            assert_eq!((pose.x, pose.y), (start.x, start.y));
        }
    }

    #[test]
    fn place_moves_a_body_and_zeroes_velocity() {
        let mut sim = RapierSimulation::new();
        sim.apply_impulse(Body::Ball, Vec2::new(5.0, 0.0));
        sim.place(Body::Ball, Pose { x: 321.0, y: 123.0, rot: 0.5 });

        let pose = sim.pose(Body::Ball);
        assert!((pose.x - 321.0).abs() < 1e-4);
        assert!((pose.y - 123.0).abs() < 1e-4);

        // No residual velocity: stepping barely moves it
        sim.step();
        let after = sim.pose(Body::Ball);
        assert!((after.x - 321.0).abs() < 1e-3);
    }

    #[test]
    fn impulse_moves_the_target_body_only() {
        let mut sim = RapierSimulation::new();
        sim.apply_impulse(Body::Player(0), Vec2::new(10.0, 0.0));
        for _ in 0..10 {
            sim.step();
        }
        assert!(sim.pose(Body::Player(0)).x > starting_pose(Body::Player(0)).x);
        let p1 = sim.pose(Body::Player(1));
        let p1_start = starting_pose(Body::Player(1));
        assert!((p1.x - p1_start.x).abs() < 1e-3);
    }
}
