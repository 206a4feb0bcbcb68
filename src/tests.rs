use crate::{
    constant, Application, ApplicationContext, Assembly, BuildError,
    BuildFailure, ContainerSetup, DaemonConfig, DaemonContext, DynSvc,
    Extension, InjectError, IntoFallible, IntoNullable, IntoPrototype,
    IntoSingleton, Key, LifetimeError, LifetimeState, NamespaceSetup,
    ProviderKind, ProviderScope, Qualified, Qualifier, ResolutionOrder,
    ScheduleConfig, ScheduledContext, ServiceInfo, Supplier, Svc,
};
use parking_lot::Mutex;
use std::{
    fmt::{Display, Formatter},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::{Duration, Instant},
};

struct A(u8);

impl A {
    fn new() -> Self {
        A(1)
    }
}

struct B {
    a: Svc<A>,
}

impl B {
    fn new(a: Svc<A>) -> Self {
        B { a }
    }
}

struct C {
    a: Svc<A>,
    b: Svc<B>,
}

impl C {
    fn new(a: Svc<A>, b: Svc<B>) -> Self {
        C { a, b }
    }
}

struct Missing;

struct Needy;

impl Needy {
    fn new(_missing: Svc<Missing>) -> Self {
        Needy
    }
}

#[derive(Debug)]
struct Boom;

impl Display for Boom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("boom")
    }
}

impl std::error::Error for Boom {}

#[derive(Default)]
struct Log(Mutex<Vec<String>>);

impl Log {
    fn push(&self, entry: &str) {
        self.0.lock().push(entry.to_owned());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

fn build(assembly: Assembly) -> BuildFailure {
    match assembly.build() {
        Ok(_) => panic!("the build should have failed"),
        Err(failure) => failure,
    }
}

#[test]
fn producers_are_written_before_consumers() {
    let mut assembly = Application::builder("ordering");
    assembly.install(B::new.singleton());
    assembly.install(A::new.singleton());

    let image = assembly.build().unwrap();
    let a = image.writer_position(Key::of::<A>()).unwrap();
    let b = image.writer_position(Key::of::<B>()).unwrap();
    assert!(a < b);

    let application = image.launch().unwrap();
    let a: Svc<A> = application.get().unwrap();
    let b: Svc<B> = application.get().unwrap();
    assert!(Svc::ptr_eq(&a, &b.a));
    assert_eq!(1, b.a.0);
}

#[test]
fn duplicate_providers_report_every_site() {
    let mut assembly = Application::builder("duplicates");
    assembly.provide(constant(A(1)));
    assembly.provide(constant(A(2)));

    let failure = build(assembly);
    assert_eq!("duplicates", failure.application());
    let sites = failure
        .errors()
        .iter()
        .find_map(|error| match error {
            BuildError::DuplicateProvider { key, sites, .. }
                if *key == Key::of::<A>() =>
            {
                Some(sites.clone())
            }
            _ => None,
        })
        .expect("a duplicate provider error");
    assert_eq!(2, sites.len());
    assert_ne!(sites[0].line(), sites[1].line());

    let message = failure.to_string();
    for site in sites {
        assert!(message.contains(&site.to_string()), "{message}");
    }
}

#[test]
fn same_key_in_different_containers_is_allowed() {
    let mut assembly = Application::builder("containers");
    let root = assembly.root();
    let child = assembly.container("child", root);
    assembly.provide(constant(A(1)));
    assembly.provide_in(child, constant(A(2)));

    let application = assembly.build().unwrap().launch().unwrap();
    let root_a: Svc<A> = application.get().unwrap();
    let child_a: Svc<A> = application.get_in(child, Key::of::<A>()).unwrap();
    assert_eq!(1, root_a.0);
    assert_eq!(2, child_a.0);
}

#[test]
fn missing_dependencies_name_the_key_and_the_bean() {
    let mut assembly = Application::builder("missing");
    assembly.install(Needy::new.singleton());

    let failure = build(assembly);
    match failure.errors() {
        [BuildError::UnresolvedDependency {
            key, bean, consumer, ..
        }] => {
            assert_eq!(Key::of::<Missing>(), *key);
            assert_eq!(ServiceInfo::of::<Needy>(), *bean);
            assert_eq!("Needy::new([Missing])", consumer.as_str());
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }

    let message = failure.to_string();
    assert!(message.contains("Missing"), "{message}");
    assert!(message.contains("Needy"), "{message}");
}

#[test]
fn missing_sibling_parameters_are_marked() {
    struct Pair;

    impl Pair {
        fn new(_a: Svc<A>, _missing: Svc<Missing>) -> Self {
            Pair
        }
    }

    let mut assembly = Application::builder("siblings");
    assembly.install(A::new.singleton());
    assembly.install(Pair::new.singleton());

    match build(assembly).errors() {
        [BuildError::UnresolvedDependency { consumer, .. }] => {
            assert_eq!("Pair::new(A, [Missing])", consumer.as_str());
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn write_order_is_deterministic() {
    fn assembly() -> Assembly {
        let mut assembly = Application::builder("deterministic");
        assembly.install(C::new.singleton());
        assembly.install(B::new.singleton());
        assembly.install(A::new.singleton());
        assembly
    }

    let order = |assembly: Assembly| -> Vec<String> {
        assembly
            .build()
            .unwrap()
            .write_order()
            .iter()
            .map(|writer| writer.site().to_string())
            .collect()
    };

    let first = order(assembly());
    assert_eq!(vec!["A::new", "B::new", "C::new"], first);
    assert_eq!(first, order(assembly()));
}

#[test]
fn optional_dependencies_may_be_absent() {
    struct Lenient {
        missing: Option<Svc<Missing>>,
        a: Option<Svc<A>>,
    }

    impl Lenient {
        fn new(missing: Option<Svc<Missing>>, a: Option<Svc<A>>) -> Self {
            Lenient { missing, a }
        }
    }

    let mut assembly = Application::builder("optional");
    assembly.install(Lenient::new.singleton());
    assembly.install(A::new.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let lenient: Svc<Lenient> = application.get().unwrap();
    assert!(lenient.missing.is_none());
    assert!(lenient.a.is_some());
}

#[test]
fn constant_slots_are_written_once() {
    let mut assembly = Application::builder("write-once");
    assembly.install(A::new.singleton());

    let image = assembly.build().unwrap();
    let slot = image
        .write_order()
        .iter()
        .find(|writer| writer.key() == Some(Key::of::<A>()))
        .and_then(|writer| writer.slot())
        .unwrap();

    let application = image.launch().unwrap();
    let arena = application.arena().unwrap();
    assert!(arena.is_written(slot));
    let replacement: DynSvc = Svc::new(A(9));
    match arena.store(slot, Some(replacement)) {
        Err(InjectError::SlotAlreadyWritten { key, .. }) => {
            assert_eq!(Key::of::<A>(), key);
        }
        other => panic!("unexpected result: {other:?}"),
    }

    let first: Svc<A> = application.get().unwrap();
    let second: Svc<A> = application.get().unwrap();
    assert!(Svc::ptr_eq(&first, &second));
    assert_eq!(1, second.0);
}

#[test]
fn applications_of_one_image_are_independent() {
    let mut assembly = Application::builder("independent");
    assembly.install(A::new.singleton());
    let image = assembly.build().unwrap();

    let first = image.launch().unwrap();
    let second = image.launch().unwrap();
    let a1: Svc<A> = first.get().unwrap();
    let a2: Svc<A> = second.get().unwrap();
    assert!(!Svc::ptr_eq(&a1, &a2));
}

#[test]
fn states_never_go_backwards() {
    let mut assembly = Application::builder("monotonic");
    assembly.install(A::new.singleton());
    let application = assembly.build().unwrap().new_application();

    let done = Svc::new(AtomicBool::new(false));
    let sampler = {
        let application = application.clone();
        let done = done.clone();
        thread::spawn(move || {
            let mut samples = Vec::new();
            while !done.load(Ordering::SeqCst) {
                samples.push(application.state());
                thread::yield_now();
            }
            samples.push(application.state());
            samples
        })
    };

    assert_eq!(LifetimeState::Uninitialized, application.state());
    application.initialize().unwrap();
    assert_eq!(LifetimeState::Initialized, application.state());
    application.start().unwrap();
    assert_eq!(LifetimeState::Running, application.state());
    application.stop().unwrap();
    assert_eq!(LifetimeState::Terminated, application.state());
    done.store(true, Ordering::SeqCst);

    let samples = sampler.join().unwrap();
    assert!(samples.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(Some(&LifetimeState::Terminated), samples.last());
}

#[test]
fn awaiting_a_reached_state_returns_true() {
    let mut assembly = Application::builder("await");
    assembly.install(A::new.singleton());
    let application = assembly.build().unwrap().new_application();

    let waiter = {
        let application = application.clone();
        thread::spawn(move || {
            application.await_state_timeout(
                LifetimeState::Running,
                Duration::from_secs(30),
            )
        })
    };

    assert!(!application
        .await_state_timeout(LifetimeState::Initialized, Duration::from_millis(5))
        .unwrap());
    application.initialize().unwrap();
    application.start().unwrap();
    assert!(waiter.join().unwrap().unwrap());
    application.stop().unwrap();
}

#[test]
fn awaiting_running_without_an_entry_point_returns_immediately() {
    let mut assembly = Application::builder("no-entry-point");
    assembly.install(A::new.singleton());
    let image = assembly.build().unwrap();
    assert!(!image.has_entry_point());

    let application = image.launch().unwrap();
    assert_eq!(LifetimeState::Initialized, application.state());

    let started = Instant::now();
    assert!(!application
        .await_state_timeout(LifetimeState::Running, Duration::ZERO)
        .unwrap());
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn launching_runs_the_entry_point() {
    struct Main {
        a: Svc<A>,
    }

    impl Main {
        fn new(a: Svc<A>) -> Self {
            Main { a }
        }

        fn run(&self) -> Result<u32, Boom> {
            Ok(u32::from(self.a.0) + 41)
        }
    }

    let mut assembly = Application::builder("entry");
    assembly.install(Main::new.singleton().entry_point(Main::run));
    assembly.install(A::new.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    assert_eq!(LifetimeState::Running, application.state());
    let result: Svc<u32> = application.entry_result().unwrap().unwrap();
    assert_eq!(42, *result);

    application.stop().unwrap();
    assert_eq!(LifetimeState::Terminated, application.state());
}

#[test]
fn a_second_entry_point_is_rejected() {
    struct First;
    struct Second;

    impl First {
        fn run(&self) {}
    }

    impl Second {
        fn run(&self) {}
    }

    let mut assembly = Application::builder("two-entry-points");
    assembly.install((|| First).singleton().entry_point(First::run));
    assembly.install((|| Second).singleton().entry_point(Second::run));

    match build(assembly).errors() {
        [BuildError::InvalidOperation { bean, .. }] => {
            assert_eq!(ServiceInfo::of::<Second>(), *bean);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn hooks_run_in_order_and_stop_hooks_in_reverse() {
    struct First {
        log: Svc<Log>,
    }

    impl First {
        fn new(log: Svc<Log>) -> Self {
            First { log }
        }

        fn start(&self) {
            self.log.push("first started");
        }

        fn stop(&self) {
            self.log.push("first stopped");
        }
    }

    struct Second {
        log: Svc<Log>,
    }

    impl Second {
        fn new(log: Svc<Log>) -> Self {
            Second { log }
        }

        fn start(&self) {
            self.log.push("second started");
        }

        fn stop(&self) -> Result<(), Boom> {
            self.log.push("second stopped");
            Err(Boom)
        }
    }

    let mut assembly = Application::builder("hooks");
    assembly.provide(constant(Log::default()));
    assembly.install(First::new.singleton().on_start(First::start).on_stop(First::stop));
    assembly.install(
        Second::new
            .singleton()
            .on_start(Second::start)
            .on_stop(Second::stop),
    );

    let application = assembly.build().unwrap().launch().unwrap();
    application.start().unwrap();
    application.stop().unwrap();
    application.stop().unwrap();

    let log: Svc<Log> = application.get().unwrap();
    assert_eq!(
        vec![
            "first started",
            "second started",
            "second stopped",
            "first stopped"
        ],
        log.entries()
    );
}

#[test]
fn lifecycle_operations_check_the_state() {
    let mut assembly = Application::builder("illegal");
    assembly.install(A::new.singleton());
    let application = assembly.build().unwrap().new_application();

    for result in [application.start(), application.stop()] {
        match result {
            Err(LifetimeError::IllegalState { state, .. }) => {
                assert_eq!(LifetimeState::Uninitialized, state);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
    assert!(matches!(
        application.get::<A>(),
        Err(InjectError::NotInitialized)
    ));

    application.initialize().unwrap();
    assert!(matches!(
        application.initialize(),
        Err(LifetimeError::IllegalState { .. })
    ));

    application.stop().unwrap();
    assert_eq!(LifetimeState::Terminated, application.state());
}

#[test]
fn failed_initialization_terminates_the_application() {
    fn open() -> Result<A, Boom> {
        Err(Boom)
    }

    let mut assembly = Application::builder("failing");
    assembly.install(open.fallible().singleton());
    assembly.install(B::new.singleton());
    let image = assembly.build().unwrap();

    let application = image.new_application();
    match application.initialize() {
        Err(LifetimeError::LaunchFailed { reached, cause }) => {
            assert_eq!(LifetimeState::Initializing, reached);
            assert!(matches!(
                cause.as_ref(),
                InjectError::ActivationFailed { .. }
            ));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert_eq!(LifetimeState::Terminated, application.state());
    assert!(application.arena().is_none());
    assert!(application.controller().failure().is_some());
    assert!(application.await_state(LifetimeState::Initializing).is_ok());
    assert!(application.await_state(LifetimeState::Initialized).is_err());
    assert!(application
        .await_state_timeout(LifetimeState::Terminated, Duration::ZERO)
        .is_err());
    assert!(image.launch().is_err());
}

#[test]
fn failed_start_discards_the_arena() {
    struct Fragile;

    impl Fragile {
        fn start(&self) -> Result<(), Boom> {
            Err(Boom)
        }
    }

    let mut assembly = Application::builder("fragile");
    assembly.install((|| Fragile).singleton().on_start(Fragile::start));
    let application = assembly.build().unwrap().launch().unwrap();

    match application.start() {
        Err(LifetimeError::LaunchFailed { reached, .. }) => {
            assert_eq!(LifetimeState::Starting, reached);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(LifetimeState::Terminated, application.state());
    assert!(application.arena().is_none());
    assert!(application.await_state(LifetimeState::Running).is_err());
    application.stop().unwrap();
}

#[test]
fn null_constants_fail_initialization() {
    fn absent() -> Option<A> {
        None
    }

    let mut assembly = Application::builder("null");
    assembly.install(absent.nullable().singleton());

    match assembly.build().unwrap().launch() {
        Err(LifetimeError::LaunchFailed { cause, .. }) => match cause.as_ref() {
            InjectError::NullConstant { key } => {
                assert_eq!(Key::of::<A>(), *key);
            }
            cause => panic!("unexpected cause: {cause}"),
        },
        Err(error) => panic!("unexpected error: {error}"),
        Ok(_) => panic!("the launch should have failed"),
    }
}

#[test]
fn null_prototypes_are_absent_for_optional_consumers() {
    fn absent() -> Option<A> {
        None
    }

    struct Lenient(Option<Svc<A>>);

    let mut assembly = Application::builder("null-prototype");
    assembly.install(absent.nullable().prototype());
    assembly.install(Lenient.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let lenient: Svc<Lenient> = application.get().unwrap();
    assert!(lenient.0.is_none());
    assert!(matches!(
        application.get::<A>(),
        Err(InjectError::NullInstance { .. })
    ));
}

#[test]
fn prototypes_are_created_per_request() {
    struct Counter(AtomicUsize);

    struct Instance(usize);

    impl Instance {
        fn new(counter: Svc<Counter>) -> Self {
            Instance(counter.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct Holder(Svc<Instance>);

    let mut assembly = Application::builder("prototypes");
    assembly.provide(constant(Counter(AtomicUsize::new(0))));
    assembly.install(Instance::new.prototype());
    assembly.install(Holder.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let holder: Svc<Holder> = application.get().unwrap();
    assert_eq!(0, holder.0 .0);

    let first: Svc<Instance> = application.get().unwrap();
    let second: Svc<Instance> = application.get().unwrap();
    assert_eq!(1, first.0);
    assert_eq!(2, second.0);

    let again: Svc<Holder> = application.get().unwrap();
    assert!(Svc::ptr_eq(&holder, &again));
}

#[test]
fn prototypes_cannot_declare_operations() {
    struct Job;

    impl Job {
        fn start(&self) {}
    }

    let mut assembly = Application::builder("prototype-operations");
    assembly.install((|| Job).prototype().on_start(Job::start));

    assert!(matches!(
        build(assembly).errors(),
        [BuildError::InvalidOperation { .. }]
    ));
}

#[test]
fn singleton_cycles_fail_the_build() {
    struct Left;
    struct Right;

    impl Left {
        fn new(_right: Svc<Right>) -> Self {
            Left
        }
    }

    impl Right {
        fn new(_left: Svc<Left>) -> Self {
            Right
        }
    }

    let mut assembly = Application::builder("cycle");
    assembly.install(Left::new.singleton());
    assembly.install(Right::new.singleton());

    match build(assembly).errors() {
        [BuildError::DependencyCycle { cycle }] => {
            assert_eq!(3, cycle.len());
            assert_eq!(cycle.first(), cycle.last());
            assert!(cycle.contains(&"Left::new".to_owned()));
            assert!(cycle.contains(&"Right::new".to_owned()));
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn singletons_requiring_themselves_fail_the_build() {
    struct Ouroboros;

    impl Ouroboros {
        fn new(_itself: Svc<Ouroboros>) -> Self {
            Ouroboros
        }
    }

    let mut assembly = Application::builder("self");
    assembly.install(Ouroboros::new.singleton());

    match build(assembly).errors() {
        [BuildError::DependencyCycle { cycle }] => {
            assert_eq!(vec!["Ouroboros::new", "Ouroboros::new"], *cycle);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn singletons_reaching_themselves_through_prototypes_fail_the_build() {
    struct Single;
    struct Helper;

    impl Single {
        fn new(_helper: Svc<Helper>) -> Self {
            Single
        }
    }

    impl Helper {
        fn new(_single: Svc<Single>) -> Self {
            Helper
        }
    }

    let mut assembly = Application::builder("self-through-prototype");
    assembly.install(Single::new.singleton());
    assembly.install(Helper::new.prototype());

    match build(assembly).errors() {
        [BuildError::DependencyCycle { cycle }] => {
            assert_eq!(vec!["Single::new", "Single::new"], *cycle);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn suppliers_break_singleton_cycles() {
    struct Left {
        right: Supplier<Right>,
    }

    struct Right {
        left: Svc<Left>,
    }

    impl Left {
        fn new(right: Supplier<Right>) -> Self {
            Left { right }
        }
    }

    impl Right {
        fn new(left: Svc<Left>) -> Self {
            Right { left }
        }
    }

    let mut assembly = Application::builder("supplied");
    assembly.install(Right::new.singleton());
    assembly.install(Left::new.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let left: Svc<Left> = application.get().unwrap();
    let right = left.right.get().unwrap();
    assert!(Svc::ptr_eq(&left, &right.left));
}

#[test]
fn prototypes_may_refer_to_each_other_through_suppliers() {
    struct Ping {
        pong: Supplier<Pong>,
    }

    struct Pong {
        ping: Supplier<Ping>,
    }

    let mut assembly = Application::builder("ping-pong");
    assembly.install((|pong: Supplier<Pong>| Ping { pong }).prototype());
    assembly.install((|ping: Supplier<Ping>| Pong { ping }).prototype());

    let application = assembly.build().unwrap().launch().unwrap();
    let ping: Svc<Ping> = application.get().unwrap();
    let pong = ping.pong.get().unwrap();
    assert!(pong.ping.get().is_ok());
}

#[test]
fn prototypes_reaching_themselves_are_detected() {
    struct Recursive;

    impl Recursive {
        fn new(this: Supplier<Recursive>) -> Result<Self, InjectError> {
            this.get().map(|_| Recursive)
        }
    }

    let mut assembly = Application::builder("recursive");
    assembly.install(Recursive::new.fallible().prototype());

    let application = assembly.build().unwrap().launch().unwrap();
    let mut error = match application.get::<Recursive>() {
        Err(error) => error,
        Ok(_) => panic!("the prototype should not be constructible"),
    };
    loop {
        match error {
            InjectError::CycleDetected { cycle } => {
                assert_eq!(vec!["Recursive::new", "Recursive::new"], cycle);
                break;
            }
            InjectError::ActivationFailed { inner, .. } => {
                match inner.downcast::<InjectError>() {
                    Ok(inner) => error = *inner,
                    Err(inner) => panic!("unexpected cause: {inner}"),
                }
            }
            error => panic!("unexpected error: {error}"),
        }
    }
}

#[test]
fn qualified_services_are_told_apart() {
    struct Left;
    impl Qualifier for Left {}

    struct Right;
    impl Qualifier for Right {}

    struct Ports {
        left: Qualified<Left, u16>,
        right: Qualified<Right, u16>,
    }

    let mut assembly = Application::builder("qualifiers");
    assembly.provide(constant(80u16).qualified::<Left>());
    assembly.provide(constant(443u16).qualified::<Right>());
    assembly.install(
        (|left: Qualified<Left, u16>, right: Qualified<Right, u16>| Ports {
            left,
            right,
        })
        .singleton(),
    );

    let application = assembly.build().unwrap().launch().unwrap();
    let ports: Svc<Ports> = application.get().unwrap();
    assert_eq!(80, *ports.left);
    assert_eq!(443, *ports.right);

    let left: Svc<u16> = application.get_key(Key::qualified::<u16, Left>()).unwrap();
    assert_eq!(80, *left);
    assert!(matches!(
        application.get::<u16>(),
        Err(InjectError::MissingService { .. })
    ));
}

#[test]
fn bean_locals_are_only_visible_to_their_bean() {
    struct Port(u16);

    struct Server(Svc<Port>);

    let mut assembly = Application::builder("locals");
    assembly.install(Server.singleton().bind_local(constant(Port(8080))));

    let application = assembly.build().unwrap().launch().unwrap();
    let server: Svc<Server> = application.get().unwrap();
    assert_eq!(8080, server.0 .0);
    assert!(application.get::<Port>().is_err());
}

#[test]
fn providers_in_more_than_one_scope_are_ambiguous() {
    struct Port(u16);

    struct Server(Svc<Port>);

    let mut assembly = Application::builder("ambiguous");
    assembly.provide(constant(Port(80)));
    assembly.install(Server.singleton().bind_local(constant(Port(8080))));

    match build(assembly).errors() {
        [BuildError::AmbiguousDependency { key, scopes, .. }] => {
            assert_eq!(Key::of::<Port>(), *key);
            assert_eq!(&[ProviderScope::Bean, ProviderScope::Container], &scopes[..]);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn restricted_search_orders_skip_other_scopes() {
    struct Port(u16);

    struct Server(Svc<Port>);

    let mut assembly = Application::builder("restricted");
    assembly.provide(constant(Port(80)));
    assembly.install(
        Server
            .singleton()
            .bind_local(constant(Port(8080)))
            .search(ResolutionOrder::new([ProviderScope::Bean])),
    );

    let application = assembly.build().unwrap().launch().unwrap();
    let server: Svc<Server> = application.get().unwrap();
    assert_eq!(8080, server.0 .0);
}

#[test]
fn shared_beans_are_visible_from_every_container() {
    let mut assembly = Application::builder("shared");
    let root = assembly.root();
    let child = assembly.container("child", root);
    assembly.install_shared(A::new.singleton());
    assembly.install_in(child, B::new.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let a: Svc<A> = application.get().unwrap();
    let b: Svc<B> = application.get_in(child, Key::of::<B>()).unwrap();
    assert!(Svc::ptr_eq(&a, &b.a));
}

#[test]
fn exported_services_reach_the_parent() {
    let mut assembly = Application::builder("exports");
    let root = assembly.root();
    let child = assembly.container("child", root);
    assembly.install_in(child, A::new.singleton());
    assembly.export::<A>(child);
    assembly.install(B::new.singleton());

    let image = assembly.build().unwrap();
    assert_eq!(Some("child"), image.container_name(child));
    assert_eq!(
        Some(ProviderKind::Delegating),
        image.provider_kind(root, Key::of::<A>())
    );
    assert_eq!(
        Some(ProviderKind::BeanInstance),
        image.provider_kind(child, Key::of::<A>())
    );

    let application = image.launch().unwrap();
    let a: Svc<A> = application.get().unwrap();
    let b: Svc<B> = application.get().unwrap();
    assert!(Svc::ptr_eq(&a, &b.a));
}

#[test]
fn imported_services_reach_the_child() {
    let mut assembly = Application::builder("imports");
    let root = assembly.root();
    let child = assembly.container("child", root);
    assembly.provide(constant(A(7)));
    assembly.import::<A>(child);
    assembly.install_in(child, B::new.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let b: Svc<B> = application.get_in(child, Key::of::<B>()).unwrap();
    assert_eq!(7, b.a.0);
}

#[test]
fn exporting_from_the_root_fails_the_build() {
    let mut assembly = Application::builder("root-export");
    let root = assembly.root();
    assembly.install(A::new.singleton());
    assembly.export::<A>(root);

    match build(assembly).into_errors().as_slice() {
        [BuildError::InvalidDelegation { key, reason, .. }] => {
            assert_eq!(Key::of::<A>(), *key);
            assert_eq!("the container has no parent", *reason);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn importing_a_missing_service_fails_the_build() {
    let mut assembly = Application::builder("missing-import");
    let root = assembly.root();
    let child = assembly.container("child", root);
    assembly.import::<B>(child);

    match build(assembly).errors() {
        [BuildError::InvalidDelegation { key, scope, reason, .. }] => {
            assert_eq!(Key::of::<B>(), *key);
            assert_eq!("container child", scope.as_str());
            assert_eq!("the target scope has no provider for the key", *reason);
        }
        errors => panic!("unexpected errors: {errors:?}"),
    }
}

#[test]
fn extensions_are_configured_once_and_attached_per_container() {
    struct Clock(u64);

    struct ClockExtension {
        configured: Svc<AtomicUsize>,
        attached: Svc<AtomicUsize>,
    }

    impl Extension for ClockExtension {
        fn configure(&self, namespace: &mut NamespaceSetup<'_>) {
            self.configured.fetch_add(1, Ordering::SeqCst);
            namespace.provide(constant(Clock(42)));
        }

        fn attach(&self, container: &mut ContainerSetup<'_>) {
            self.attached.fetch_add(1, Ordering::SeqCst);
            container.export::<Clock>();
        }
    }

    struct Timer(Svc<Clock>);

    let configured = Svc::new(AtomicUsize::new(0));
    let attached = Svc::new(AtomicUsize::new(0));
    let extension = || ClockExtension {
        configured: configured.clone(),
        attached: attached.clone(),
    };

    let mut assembly = Application::builder("extensions");
    let root = assembly.root();
    let child = assembly.container("child", root);
    let first = assembly.use_extension(root, extension());
    let second = assembly.use_extension(child, extension());
    assembly.use_extension(child, extension());
    assert_eq!(first, second);
    assembly.install_in(child, Timer.singleton());

    assert_eq!(1, configured.load(Ordering::SeqCst));
    assert_eq!(2, attached.load(Ordering::SeqCst));

    let application = assembly.build().unwrap().launch().unwrap();
    let clock: Svc<Clock> = application.get().unwrap();
    let timer: Svc<Timer> = application.get_in(child, Key::of::<Timer>()).unwrap();
    assert!(Svc::ptr_eq(&clock, &timer.0));
}

#[test]
fn extension_beans_resolve_in_their_namespace() {
    struct Secret(&'static str);

    struct Vault(Svc<Secret>);

    struct VaultExtension;

    impl Extension for VaultExtension {
        fn configure(&self, namespace: &mut NamespaceSetup<'_>) {
            namespace.provide(constant(Secret("hunter2")));
            namespace.install(Vault.singleton());
        }

        fn attach(&self, container: &mut ContainerSetup<'_>) {
            container.export::<Vault>();
        }
    }

    let mut assembly = Application::builder("vaults");
    let root = assembly.root();
    assembly.use_extension(root, VaultExtension);

    let application = assembly.build().unwrap().launch().unwrap();
    let vault: Svc<Vault> = application.get().unwrap();
    assert_eq!("hunter2", vault.0 .0);
    assert!(application.get::<Secret>().is_err());
}

#[test]
fn assemblies_belong_to_their_thread() {
    let mut assembly = Application::builder("threads");
    assembly.install(A::new.singleton());

    let result = thread::spawn(move || assembly.build()).join().unwrap();
    match result {
        Err(failure) => {
            assert!(matches!(
                failure.errors(),
                [BuildError::WrongThread { .. }]
            ));
        }
        Ok(_) => panic!("the build should have failed"),
    }

    let mut assembly = Application::builder("threads");
    let changed = thread::spawn(move || {
        assembly.install(A::new.singleton());
    })
    .join();
    assert!(changed.is_err());
}

#[test]
fn fields_are_injected_before_the_bean_is_read() {
    struct Port(u16);

    struct Server {
        port: Mutex<Option<Svc<Port>>>,
    }

    impl Server {
        fn new() -> Self {
            Server {
                port: Mutex::new(None),
            }
        }

        fn set_port(&self, port: Svc<Port>) {
            *self.port.lock() = Some(port);
        }
    }

    struct Client(u16);

    impl Client {
        fn new(server: Svc<Server>) -> Self {
            Client(server.port.lock().as_ref().map_or(0, |port| port.0))
        }
    }

    let mut assembly = Application::builder("fields");
    assembly.install(Client::new.singleton());
    assembly.install(Server::new.singleton().inject_field("port", Server::set_port));
    assembly.install((|| Port(8080)).singleton());

    let image = assembly.build().unwrap();
    let order: Vec<String> = image
        .write_order()
        .iter()
        .map(|writer| writer.site().to_string())
        .collect();
    assert_eq!(4, order.len());
    assert_eq!(Some("Client::new"), order.last().map(String::as_str));

    let application = image.launch().unwrap();
    let client: Svc<Client> = application.get().unwrap();
    assert_eq!(8080, client.0);
}

#[test]
fn members_provide_services() {
    struct Factory;

    struct Widget(u8);

    struct Gadget;

    impl Factory {
        fn widget(&self) -> Widget {
            Widget(3)
        }

        fn gadget(&self) -> Gadget {
            Gadget
        }
    }

    struct User(Svc<Widget>);

    let mut assembly = Application::builder("members");
    assembly.install(User.singleton());
    assembly.install(
        (|| Factory)
            .singleton()
            .provides(Factory::widget)
            .provides_prototype(Factory::gadget),
    );

    let application = assembly.build().unwrap().launch().unwrap();
    let user: Svc<User> = application.get().unwrap();
    let widget: Svc<Widget> = application.get().unwrap();
    assert!(Svc::ptr_eq(&user.0, &widget));
    assert_eq!(3, widget.0);

    let first: Svc<Gadget> = application.get().unwrap();
    let second: Svc<Gadget> = application.get().unwrap();
    assert!(!Svc::ptr_eq(&first, &second));
}

#[test]
fn beans_can_observe_the_application() {
    struct Observer(Svc<ApplicationContext>);

    let mut assembly = Application::builder("observed");
    assembly.install(Observer.singleton());

    let application = assembly.build().unwrap().launch().unwrap();
    let observer: Svc<Observer> = application.get().unwrap();
    assert_eq!("observed", observer.0.name());
    assert_eq!(LifetimeState::Initialized, observer.0.state());

    application.start().unwrap();
    assert_eq!(LifetimeState::Running, observer.0.state());
    application.stop().unwrap();
    assert!(observer.0.is_shutdown());
}

#[derive(Default)]
struct Worker {
    iterations: AtomicUsize,
    observed_shutdown: AtomicBool,
    interrupted: AtomicBool,
}

impl Worker {
    fn run(&self, context: Svc<DaemonContext>) {
        self.iterations.fetch_add(1, Ordering::SeqCst);
        while !context.await_shutdown(Duration::from_millis(10)) {}
        self.observed_shutdown.store(true, Ordering::SeqCst);
        self.interrupted
            .store(context.is_interrupted(), Ordering::SeqCst);
    }
}

fn wait_for(condition: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn daemons_observe_the_shutdown() {
    let mut assembly = Application::builder("daemons");
    assembly.install(Worker::default.singleton().daemon(Worker::run));
    let image = assembly.build().unwrap();
    assert_eq!(1, image.task_count());

    let application = image.launch().unwrap();
    application.start().unwrap();
    let worker: Svc<Worker> = application.get().unwrap();
    wait_for(|| worker.iterations.load(Ordering::SeqCst) > 0);

    application.stop().unwrap();
    assert!(worker.observed_shutdown.load(Ordering::SeqCst));
    assert!(!worker.interrupted.load(Ordering::SeqCst));

    let iterations = worker.iterations.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(30));
    assert_eq!(iterations, worker.iterations.load(Ordering::SeqCst));
}

#[test]
fn daemons_can_be_interrupted() {
    let mut assembly = Application::builder("interrupted");
    assembly.install(Worker::default.singleton().daemon_with(
        DaemonConfig::new().with_name("worker").interrupt_on_stop(),
        Worker::run,
    ));

    let application = assembly.build().unwrap().launch().unwrap();
    application.start().unwrap();
    let worker: Svc<Worker> = application.get().unwrap();
    wait_for(|| worker.iterations.load(Ordering::SeqCst) > 0);

    application.stop().unwrap();
    assert!(worker.observed_shutdown.load(Ordering::SeqCst));
}

#[test]
fn scheduled_operations_run_until_stopped() {
    #[derive(Default)]
    struct Ticker {
        ticks: AtomicUsize,
        last_iteration: AtomicUsize,
    }

    impl Ticker {
        fn tick(&self, context: Svc<ScheduledContext>) -> Result<(), Boom> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            self.last_iteration.store(
                usize::try_from(context.iteration()).unwrap_or(usize::MAX),
                Ordering::SeqCst,
            );
            if context.iteration() == 2 {
                return Err(Boom);
            }
            Ok(())
        }
    }

    let mut assembly = Application::builder("scheduled");
    assembly.install(Ticker::default.singleton().scheduled(
        ScheduleConfig::every(Duration::from_millis(2)).with_name("ticker"),
        Ticker::tick,
    ));

    let application = assembly.build().unwrap().launch().unwrap();
    application.start().unwrap();
    let ticker: Svc<Ticker> = application.get().unwrap();
    wait_for(|| ticker.ticks.load(Ordering::SeqCst) >= 3);

    application.stop().unwrap();
    let ticks = ticker.ticks.load(Ordering::SeqCst);
    assert_eq!(ticks, ticker.last_iteration.load(Ordering::SeqCst));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(ticks, ticker.ticks.load(Ordering::SeqCst));
}
