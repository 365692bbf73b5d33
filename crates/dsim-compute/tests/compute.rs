use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;

use dsim_compute::compute::{execute, Compute};
use dsim_compute::vm::{partition_speed, VirtualMachine};
use dsim_core::Simulation;

fn make_compute(sim: &mut Simulation, name: &str, speed: f64) -> Rc<RefCell<Compute>> {
    let compute = Rc::new(RefCell::new(Compute::new(speed, sim.create_context(name))));
    sim.add_handler(name, compute.clone());
    compute
}

fn spawn_job(
    sim: &mut Simulation,
    name: &str,
    compute: Rc<RefCell<Compute>>,
    start: f64,
    flops: f64,
    finished: Rc<RefCell<Vec<(String, f64)>>>,
) {
    let ctx = sim.create_context(name);
    sim.spawn_actor(ctx.id(), async move {
        ctx.sleep(start).await;
        execute(&compute, &ctx, flops).await;
        finished.borrow_mut().push((ctx.name().to_string(), ctx.time()));
    });
}

#[test]
fn test_simultaneous_jobs_share_speed() {
    let mut sim = Simulation::new(123);
    let compute = make_compute(&mut sim, "host", 10.);
    let finished = Rc::new(RefCell::new(Vec::new()));
    spawn_job(&mut sim, "job1", compute.clone(), 0., 10., finished.clone());
    spawn_job(&mut sim, "job2", compute.clone(), 0., 10., finished.clone());

    assert!(sim.run().is_ok());
    assert_eq!(
        *finished.borrow(),
        vec![("job1".to_string(), 2.), ("job2".to_string(), 2.)]
    );
    assert_eq!(compute.borrow().running_count(), 0);
}

#[test]
fn test_late_job_slows_down_running_one() {
    let mut sim = Simulation::new(123);
    let compute = make_compute(&mut sim, "host", 10.);
    let finished = Rc::new(RefCell::new(Vec::new()));
    spawn_job(&mut sim, "long", compute.clone(), 0., 20., finished.clone());
    spawn_job(&mut sim, "short", compute, 1., 5., finished.clone());

    assert!(sim.run().is_ok());
    let finished = finished.borrow();
    assert_eq!(finished[0].0, "short");
    assert_abs_diff_eq!(finished[0].1, 2., epsilon = 1e-9);
    assert_eq!(finished[1].0, "long");
    assert_abs_diff_eq!(finished[1].1, 2.5, epsilon = 1e-9);
}

#[test]
fn test_sequential_jobs_advance_time() {
    let mut sim = Simulation::new(123);
    let compute = make_compute(&mut sim, "host", 100.);
    let ctx = sim.create_context("actor");
    let times = Rc::new(RefCell::new(Vec::new()));
    let times_clone = times.clone();
    sim.spawn_actor(ctx.id(), async move {
        for flops in [50., 100., 0., 200.] {
            execute(&compute, &ctx, flops).await;
            times_clone.borrow_mut().push(ctx.time());
        }
    });
    assert!(sim.run().is_ok());
    assert_eq!(*times.borrow(), vec![0.5, 1.5, 1.5, 3.5]);
}

#[test]
fn test_vm_gets_share_of_host_speed() {
    let mut sim = Simulation::new(123);
    let speeds = partition_speed(100., &[1, 3]);
    let small = VirtualMachine::new("vm1", "host", 1, make_compute(&mut sim, "vm1", speeds[0]));
    let large = VirtualMachine::new("vm2", "host", 3, make_compute(&mut sim, "vm2", speeds[1]));
    assert_eq!(small.speed(), 25.);
    assert_eq!(large.speed(), 75.);
    assert_eq!(large.host(), "host");

    let finished = Rc::new(RefCell::new(Vec::new()));
    spawn_job(&mut sim, "job1", small.compute(), 0., 50., finished.clone());
    spawn_job(&mut sim, "job2", large.compute(), 0., 150., finished.clone());
    assert!(sim.run().is_ok());
    assert_eq!(
        *finished.borrow(),
        vec![("job1".to_string(), 2.), ("job2".to_string(), 2.)]
    );
}

#[test]
#[should_panic(expected = "must be non-negative")]
fn test_negative_flops_panics() {
    let mut sim = Simulation::new(123);
    let compute = make_compute(&mut sim, "host", 10.);
    compute.borrow_mut().run(-1., 0);
}

#[test]
#[should_panic(expected = "must be positive")]
fn test_zero_speed_panics() {
    let mut sim = Simulation::new(123);
    make_compute(&mut sim, "host", 0.);
}
