#[cfg(test)]
mod topology_tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use platreg::Error;
    use platreg::boards::{self, accton_as5835, accton_as7726, accton_wedge100};
    use platreg::enums::MuxChip;
    use platreg::sim::{ClientEvent, FakeClock, SimAdapters, SimClientFactory};
    use platreg::topology::{
        self, BusRef, ClientFactory, ClientGuard, DeviceKind, DeviceSpec, GpioConfig, RetryPolicy, find_adapter,
        wait_for_bus,
    };

    const ISMT: &str = "SMBus iSMT adapter";
    const I801: &str = "SMBus I801 adapter";

    fn created(events: &[ClientEvent]) -> Vec<(u32, u16)> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Created { bus, addr, .. } => Some((*bus, *addr)),
                _ => None,
            })
            .collect()
    }

    fn deleted(events: &[ClientEvent]) -> Vec<(u32, u16)> {
        events
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Deleted { bus, addr } => Some((*bus, *addr)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn adapter_found_on_a_later_poll() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        adapters.add_at_poll(3, ISMT, 5);
        let clock = FakeClock::new();

        let bus = find_adapter(&adapters, ISMT, &RetryPolicy::default(), &clock).unwrap();

        assert_eq!(bus, 3);
        assert_eq!(adapters.polls(), 5);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(100); 4]);
    }

    #[test]
    fn adapter_never_appears() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let clock = FakeClock::new();

        let err = find_adapter(&adapters, ISMT, &RetryPolicy::default(), &clock).unwrap_err();

        assert!(matches!(err, Error::DeviceNotFound(_)));
        assert_eq!(adapters.polls(), 20);
        assert_eq!(clock.sleeps().len(), 19);
        assert_eq!(clock.total(), Duration::from_millis(1900));
    }

    #[test]
    fn lowest_matching_bus_wins() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(7, "SMBus I801 adapter at f000");
        adapters.add(1, ISMT);
        adapters.add(2, "SMBus I801 adapter at e000");
        let clock = FakeClock::new();

        let bus = find_adapter(&adapters, I801, &RetryPolicy::default(), &clock).unwrap();

        assert_eq!(bus, 2);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn single_attempt_policy_never_sleeps() {
        let adapters = SimAdapters::new();
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(0, Duration::from_secs(1));

        assert_eq!(policy.attempts, 1);
        assert!(find_adapter(&adapters, ISMT, &policy, &clock).is_err());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn wait_for_numbered_bus() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add_at_poll(12, "i2c-1-mux (chan_id 2)", 3);
        let clock = FakeClock::new();
        let policy = RetryPolicy::new(5, Duration::from_millis(10));

        wait_for_bus(&adapters, 12, &policy, &clock).unwrap();
        assert_eq!(clock.total(), Duration::from_millis(20));

        let err = wait_for_bus(&adapters, 13, &policy, &clock).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));
    }

    #[test]
    fn drivers() {
        let gpio = DeviceKind::GpioExpander(GpioConfig {
            chip: "pca9555",
            base: 448,
            lines: &["psu1_present", "psu2_present"],
        });
        assert_eq!(gpio.driver(), "pca9555");
        assert_eq!(DeviceSpec::qsfp(BusRef::Fixed(3), "port1").kind.driver(), "sff8436");
        assert_eq!(DeviceSpec::qsfp(BusRef::Fixed(3), "port1").addr, 0x50);
        assert_eq!(DeviceSpec::mux(BusRef::Fixed(0), 0x71, MuxChip::Pca9545, 10, true).kind.driver(), "pca9545");
        assert_eq!(DeviceSpec::sensor(BusRef::Fixed(0), 0x48, "lm75").kind.driver(), "lm75");
        assert_eq!(DeviceSpec::psu(BusRef::Fixed(0), 0x58, "cpr4011").kind.driver(), "cpr4011");
        assert_eq!(DeviceSpec::cpld(BusRef::Fixed(0), 0x60, "cpld-1").kind.driver(), "cpld-1");
    }

    #[test]
    fn guard_deletes_once() {
        let _ = env_logger::try_init();
        let factory = SimClientFactory::new(10);
        let kind = DeviceKind::Sensor("lm75");

        let guard = ClientGuard::create(&factory, 0, 0x48, kind).unwrap();
        drop(guard);

        let guard = ClientGuard::create(&factory, 0, 0x49, kind).unwrap();
        guard.release().unwrap();

        assert_eq!(deleted(&factory.events()), vec![(0, 0x48), (0, 0x49)]);
        assert!(factory.live().is_empty());
    }

    #[test]
    fn as5835_bootstrap() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        adapters.add(1, ISMT);
        let factory = SimClientFactory::with_adapters(2, &adapters);
        let clock = FakeClock::new();
        let board = boards::find("accton_as5835_54t").unwrap();

        let ctx = board.bootstrap(&factory, &adapters, &clock, &RetryPolicy::default()).unwrap();

        assert_eq!(ctx.adapter_bus(ISMT), Some(1));
        assert_eq!(ctx.resolve(BusRef::Virtual(10)).unwrap(), 2);
        assert_eq!(ctx.resolve(BusRef::Virtual(11)).unwrap(), 3);
        // mux2 on i2c-2 takes 10..17, mux3 takes 18..25, mux4 takes 26..29
        assert_eq!(ctx.resolve(BusRef::Virtual(18)).unwrap(), 10);
        assert_eq!(ctx.resolve(BusRef::Virtual(28)).unwrap(), 20);
        assert_eq!(ctx.resolve(BusRef::Virtual(37)).unwrap(), 29);
        assert!(ctx.resolve(BusRef::Virtual(38)).is_err());

        assert_eq!(ctx.clients().len(), accton_as5835::DEVICES_54T.len());
        assert_eq!(
            ctx.cplds(),
            vec![
                (accton_as5835::CPUCPLD_NAME, 1, 0x65),
                (accton_as5835::CPLD1_NAME, 3, 0x60),
                (accton_as5835::CPLD2_NAME, 3, 0x61),
                (accton_as5835::CPLD3_NAME, 3, 0x62),
                (accton_as5835::CPLD4_NAME, 3, 0x63),
            ]
        );

        let live = factory.live();
        assert!(live.contains(&(20, 0x50, "sff8436".to_string())));
        assert!(live.contains(&(26, 0x4b, "tmp75".to_string())));
        assert!(clock.sleeps().is_empty());

        let order = created(&factory.events());
        drop(ctx);

        let mut reversed = order.clone();
        reversed.reverse();
        assert_eq!(deleted(&factory.events()), reversed);
        assert!(factory.live().is_empty());
    }

    #[test]
    fn failure_midway_rolls_back_newest_first() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(1, ISMT);
        let factory = SimClientFactory::with_adapters(2, &adapters);
        factory.fail_at(3, 0x62);
        let clock = FakeClock::new();

        let err = accton_as5835::AS5835_54T
            .bootstrap(&factory, &adapters, &clock, &RetryPolicy::default())
            .unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));

        let events = factory.events();
        let made = created(&events);
        assert_eq!(made.len(), accton_as5835::DEVICES_54T.len() - 2);
        assert_eq!(made.last(), Some(&(3, 0x61)));

        let mut reversed = made.clone();
        reversed.reverse();
        assert_eq!(deleted(&events), reversed);
        assert!(factory.live().is_empty());
    }

    #[test]
    fn missing_adapter_creates_nothing() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(2, &adapters);
        let clock = FakeClock::new();

        let err = accton_as5835::AS5835_54T
            .bootstrap(&factory, &adapters, &clock, &RetryPolicy::default())
            .unwrap_err();

        assert_eq!(err.errno(), nix::errno::Errno::ENODEV);
        assert!(factory.events().is_empty());
        assert_eq!(clock.sleeps().len(), 19);
    }

    #[test]
    fn late_adapter_rolls_back_earlier_devices() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(5, &adapters);
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::sensor(BusRef::Adapter(I801), 0x48, "lm75"),
            DeviceSpec::sensor(BusRef::Adapter(I801), 0x49, "lm75"),
            DeviceSpec::sensor(BusRef::Adapter(ISMT), 0x4a, "lm75"),
        ];

        assert!(topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).is_err());
        assert_eq!(deleted(&factory.events()), vec![(0, 0x49), (0, 0x48)]);
        assert!(factory.live().is_empty());
    }

    #[test]
    fn overlapping_virtual_buses_rejected() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(1, &adapters);
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9543, 10, true),
            DeviceSpec::mux(BusRef::Fixed(0), 0x71, MuxChip::Pca9543, 11, true),
        ];

        let err = topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).unwrap_err();

        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(deleted(&factory.events()), vec![(0, 0x71), (0, 0x70)]);
    }

    /// Reports one more mux channel on each call.
    struct SlowMux<'a> {
        inner: SimClientFactory<'a>,
        calls: AtomicU32,
    }

    impl ClientFactory for SlowMux<'_> {
        fn new_client(&self, bus: u32, addr: u16, driver: &str) -> platreg::Result<()> {
            self.inner.new_client(bus, addr, driver)
        }

        fn delete_client(&self, bus: u32, addr: u16) -> platreg::Result<()> {
            self.inner.delete_client(bus, addr)
        }

        fn mux_channels(&self, bus: u32, addr: u16, count: u8) -> platreg::Result<Vec<u32>> {
            let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let mut channels = self.inner.mux_channels(bus, addr, count)?;
            channels.truncate(calls as usize);
            Ok(channels)
        }

        fn set_mux_idle(&self, bus: u32, addr: u16, deselect: bool) -> platreg::Result<()> {
            self.inner.set_mux_idle(bus, addr, deselect)
        }

        fn check_present(&self, bus: u32, addr: u16) -> platreg::Result<()> {
            self.inner.check_present(bus, addr)
        }
    }

    #[test]
    fn mux_channels_are_polled_until_complete() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SlowMux {
            inner: SimClientFactory::with_adapters(4, &adapters),
            calls: AtomicU32::new(0),
        };
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::mux(BusRef::Fixed(0), 0x71, MuxChip::Pca9545, 20, false),
            DeviceSpec::sensor(BusRef::Virtual(23), 0x48, "lm75"),
        ];

        let ctx = topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).unwrap();

        assert_eq!(factory.calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.sleeps().len(), 3);
        assert_eq!(ctx.resolve(BusRef::Virtual(23)).unwrap(), 7);
        assert_eq!(ctx.clients()[1].bus, 7);
        assert_eq!(factory.inner.mux_idle(0, 0x71), Some(false));
    }

    #[test]
    fn mux_idle_state_follows_table() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(2, &adapters);
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9543, 10, true),
            DeviceSpec::mux(BusRef::Fixed(0), 0x71, MuxChip::Pca9543, 12, false),
        ];

        let _ctx = topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).unwrap();

        assert_eq!(factory.mux_idle(0, 0x70), Some(true));
        assert_eq!(factory.mux_idle(0, 0x71), Some(false));
        assert_eq!(factory.mux_idle(0, 0x72), None);
    }

    #[test]
    fn clients_found_by_label() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        adapters.add(1, ISMT);
        let factory = SimClientFactory::with_adapters(2, &adapters);
        let clock = FakeClock::new();
        let board = boards::find("accton_as5835_54t").unwrap();

        let ctx = board.bootstrap(&factory, &adapters, &clock, &RetryPolicy::default()).unwrap();

        let port = ctx.find_label("port49").unwrap();
        assert_eq!((port.bus, port.addr), (20, 0x50));
        assert_eq!(port.kind.label(), Some("port49"));
        assert_eq!(ctx.find_label("board_eeprom").unwrap().bus, 1);
        assert!(ctx.find_label("port1").is_none());
        assert_eq!(DeviceKind::Sensor("tmp75").label(), None);

        // every pca954x on the board deselects when idle
        for (bus, addr) in [(1, 0x77), (2, 0x70), (2, 0x72), (2, 0x71)] {
            assert_eq!(factory.mux_idle(bus, addr), Some(true), "i2c-{} 0x{:02x}", bus, addr);
        }
    }

    #[test]
    fn wedge100_bootstrap() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        adapters.add(1, "CP2112 SMBus Bridge at 1-1.3:1.0");
        let factory = SimClientFactory::with_adapters(2, &adapters);
        let clock = FakeClock::new();
        let board = boards::find("accton_wedge100_32x").unwrap();

        let ctx = board.bootstrap(&factory, &adapters, &clock, &RetryPolicy::default()).unwrap();

        assert_eq!(ctx.clients().len(), accton_wedge100::DEVICES_32X.len());
        for addr in 0x70..=0x74 {
            assert_eq!(factory.mux_idle(1, addr), Some(true));
        }
        // port1 sits on channel 1 of the first mux
        assert_eq!(ctx.find_label("port1").unwrap().bus, 3);
        assert_eq!(ctx.find_label("port2").unwrap().bus, 2);
        assert_eq!(ctx.cplds(), vec![(accton_wedge100::CPLD_NAME, 1, 0x32)]);

        let expanders: Vec<_> = ctx
            .clients()
            .iter()
            .filter_map(|c| match c.kind {
                DeviceKind::GpioExpander(gpio) => Some((c.bus, c.addr, gpio)),
                _ => None,
            })
            .collect();
        assert_eq!(expanders.len(), 6);
        let (bus, addr, present) = expanders[2];
        assert_eq!((bus, addr), (36, 0x22));
        assert_eq!(present.lines, accton_wedge100::GPIO3_LINES);
        assert!(present.map().starts_with("101\nqsfp2_present\nqsfp1_present\n"));
        assert_eq!(present.map().lines().count(), 17);
    }

    #[test]
    fn gpio_expander_map() {
        let gpio = GpioConfig {
            chip: "pca9555",
            base: 448,
            lines: &["psu1_present", "psu2_present"],
        };
        assert_eq!(gpio.map(), "448\npsu1_present\npsu2_present\n");
        assert_eq!(DeviceKind::GpioExpander(gpio).label(), None);
    }

    fn same<T: Eq>(a: T, b: T) -> bool {
        a == b
    }

    #[test]
    fn mux_specs_compare() {
        let a = DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9548, 10, true);

        assert!(same(a, DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9548, 10, true)));
        assert!(!same(a, DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9548, 10, false)));
        assert!(!same(a, DeviceSpec::mux(BusRef::Fixed(0), 0x70, MuxChip::Pca9547, 10, true)));
        assert!(same(MuxChip::Pca9545, MuxChip::Pca9545));
    }

    #[test]
    fn detach_leaves_clients_in_place() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(1, &adapters);
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::eeprom(BusRef::Adapter(I801), 0x57, "24c02", "board_eeprom"),
            DeviceSpec::psu(BusRef::Fixed(0), 0x58, "cpr4011"),
        ];

        let ctx = topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).unwrap();
        let clients = ctx.detach();

        let clients: Vec<_> = clients.iter().map(|(bus, addr, kind)| (*bus, *addr, kind.driver())).collect();
        assert_eq!(clients, vec![(0, 0x57, "24c02"), (0, 0x58, "cpr4011")]);
        assert!(deleted(&factory.events()).is_empty());
        assert_eq!(factory.live().len(), 2);
    }

    #[test]
    fn release_one_client() {
        let _ = env_logger::try_init();
        let adapters = SimAdapters::new();
        adapters.add(0, I801);
        let factory = SimClientFactory::with_adapters(1, &adapters);
        let clock = FakeClock::new();
        let table = [
            DeviceSpec::sensor(BusRef::Fixed(0), 0x48, "lm75"),
            DeviceSpec::sensor(BusRef::Fixed(0), 0x49, "lm75"),
        ];

        let mut ctx = topology::bootstrap(&factory, &adapters, &clock, &RetryPolicy::default(), &table).unwrap();
        ctx.release(0, 0x48).unwrap();
        assert!(matches!(ctx.release(0, 0x48), Err(Error::DeviceNotFound(_))));
        assert_eq!(ctx.clients().len(), 1);
        assert_eq!(factory.live(), vec![(0, 0x49, "lm75".to_string())]);
    }

    fn as7726_adapters() -> SimAdapters {
        let adapters = SimAdapters::new();
        adapters.add(0, "SMBus I801 adapter at f000");
        adapters
    }

    #[test]
    fn as7726_keeps_responding_eeprom() {
        let _ = env_logger::try_init();
        let adapters = as7726_adapters();
        let factory = SimClientFactory::with_adapters(1, &adapters);
        factory.respond_at(0, 0x57);
        let clock = FakeClock::new();
        let board = boards::find("accton_as7726_32x").unwrap();

        let ctx = board.bootstrap(&factory, &adapters, &clock, &RetryPolicy::default()).unwrap();

        assert_eq!(ctx.clients().len(), accton_as7726::DEVICES_32X.len() - 1);
        let live = factory.live();
        assert!(live.contains(&(0, 0x57, "24c02".to_string())));
        assert!(!live.iter().any(|(b, a, _)| *b == 0 && *a == 0x56));
        assert_eq!(
            ctx.cplds(),
            vec![("cpld-1", 51, 0x60), ("cpld-2", 52, 0x62), ("cpld-3", 53, 0x64), ("fan-cpld", 14, 0x66)]
        );
    }

    #[test]
    fn as7726_first_responder_in_table_order() {
        let _ = env_logger::try_init();
        let adapters = as7726_adapters();
        let factory = SimClientFactory::with_adapters(1, &adapters);
        factory.respond_at(0, 0x56);
        factory.respond_at(0, 0x57);
        let clock = FakeClock::new();

        let mut ctx = topology::bootstrap(
            &factory,
            &adapters,
            &clock,
            &RetryPolicy::default(),
            accton_as7726::DEVICES_32X,
        )
        .unwrap();

        assert_eq!(accton_as7726::retain_board_eeprom(&mut ctx).unwrap(), Some(0x56));
        assert_eq!(deleted(&factory.events()), vec![(0, 0x57)]);
    }

    #[test]
    fn as7726_no_eeprom_responds() {
        let _ = env_logger::try_init();
        let adapters = as7726_adapters();
        let factory = SimClientFactory::with_adapters(1, &adapters);
        let clock = FakeClock::new();

        let mut ctx = topology::bootstrap(
            &factory,
            &adapters,
            &clock,
            &RetryPolicy::default(),
            accton_as7726::DEVICES_32X,
        )
        .unwrap();

        assert_eq!(accton_as7726::retain_board_eeprom(&mut ctx).unwrap(), None);
        assert_eq!(deleted(&factory.events()), vec![(0, 0x56), (0, 0x57)]);
        assert_eq!(ctx.clients().len(), accton_as7726::DEVICES_32X.len() - 2);
    }

    #[test]
    fn board_lookup() {
        assert!(boards::find("accton_as9999").is_none());
        let board = boards::find("accton_as5835_54t").unwrap();
        assert_eq!(board.group("cpld1").unwrap().device, accton_as5835::CPLD1_NAME);
        assert!(board.group("cpld2").is_none());
        assert!(accton_as7726::AS7726_32X.groups.is_empty());
    }
}
