#[cfg(test)]
mod bitfield_tests {
    use platreg::Error;
    use platreg::bitfield::helpers::{field_mask, get_field, put_field};
    use platreg::bitfield::{FieldValue, Flags, RegisterField};
    use platreg::sim::SimRegisters;

    const COLOURS: &[&str] = &["green", "yellow", "off", "red"];
    const LOCATOR: &[&str] = &["red", "off", "red_blinking", "red_blinking"];
    const THREE: &[&str] = &["green", "yellow", "off"];

    fn field(reg: u32, shift: u8, width: u8, flags: Flags) -> RegisterField {
        RegisterField::new("f", reg, shift, width, None, flags).unwrap()
    }

    #[test]
    fn extract_inverts_combine() {
        let _ = env_logger::try_init();

        for width in 1..=32u8 {
            for shift in 0..=(32 - width) {
                let mask = field_mask(width);
                for v in [0u32, 1, mask, 0xa5a5_a5a5, 0x5a5a_5a5a] {
                    let packed = put_field(0xdead_beef, shift, width, v);
                    assert_eq!(get_field(packed, shift, width), v & mask, "shift {} width {}", shift, width);
                }
            }
        }
    }

    #[test]
    fn active_low_is_self_inverse() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = field(0x10, 2, 3, Flags::ACTIVE_LOW | Flags::DECIMAL);

        for x in 0..8i64 {
            f.write(&regs, &x.to_string()).unwrap();
            assert_eq!(regs.get(0x10), ((!x as u8) & 0x7) << 2);
            assert_eq!(f.read(&regs).unwrap(), FieldValue::Decimal(x));
        }
    }

    #[test]
    fn every_symbol_round_trips() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = RegisterField::new("led", 0x0a, 2, 2, Some(COLOURS), Flags::empty()).unwrap();

        for name in COLOURS {
            f.write(&regs, &format!("{}\n", name)).unwrap();
            assert_eq!(f.read(&regs).unwrap(), FieldValue::Symbol(*name));
        }
    }

    #[test]
    fn duplicate_symbol_stores_first_index() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = RegisterField::new("led_locator", 0x0a, 4, 2, Some(LOCATOR), Flags::empty()).unwrap();

        f.write(&regs, "red_blinking").unwrap();
        assert_eq!(regs.get(0x0a), 2 << 4);

        regs.set(0x0a, 3 << 4);
        assert_eq!(f.read(&regs).unwrap().to_string(), "red_blinking");
    }

    #[test]
    fn symbols_are_indexed_after_complement() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = RegisterField::new("led", 0x0a, 0, 2, Some(COLOURS), Flags::ACTIVE_LOW).unwrap();

        regs.set(0x0a, 0b11);
        assert_eq!(f.read(&regs).unwrap(), FieldValue::Symbol("green"));

        f.write(&regs, "red").unwrap();
        assert_eq!(regs.get(0x0a), 0b00);
    }

    #[test]
    fn signed_extremes() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = field(0x20, 0, 8, Flags::SIGNED | Flags::DECIMAL);

        f.write(&regs, "-128").unwrap();
        assert_eq!(regs.get(0x20), 0x80);
        assert_eq!(f.read(&regs).unwrap(), FieldValue::Decimal(-128));

        f.write(&regs, "127").unwrap();
        assert_eq!(f.read(&regs).unwrap(), FieldValue::Decimal(127));

        assert!(matches!(f.write(&regs, "128"), Err(Error::InvalidArgument(_))));
        assert!(matches!(f.write(&regs, "-129"), Err(Error::InvalidArgument(_))));
        assert_eq!(f.read(&regs).unwrap(), FieldValue::Decimal(127));
    }

    #[test]
    fn signed_hex_carries_sign() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = field(0x20, 4, 4, Flags::SIGNED);

        regs.set(0x20, 0x8f);
        let v = f.read(&regs).unwrap();
        assert_eq!(v, FieldValue::Hex { value: -8, digits: 1 });
        assert_eq!(v.to_string(), "-0x8");

        f.write(&regs, "-0x1").unwrap();
        assert_eq!(regs.get(0x20), 0xff);
        assert_eq!(f.read(&regs).unwrap().to_string(), "-0x1");
    }

    #[test]
    fn partial_write_preserves_neighbours() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.set(0x10, 0b1010_0101);
        let f = field(0x10, 3, 2, Flags::empty());

        f.write(&regs, "2").unwrap();

        assert_eq!(regs.read_count(), 1);
        assert_eq!(regs.write_count(), 1);
        assert_eq!(regs.write_log(), vec![(0x10, 0b1011_0101)]);
        assert_eq!(regs.get(0x10) & !0b0001_1000, 0b1010_0101 & !0b0001_1000);
    }

    #[test]
    fn whole_register_write_skips_read() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.set(0x03, 0xff);
        let f = field(0x03, 0, 8, Flags::empty());

        f.write(&regs, "0x3c").unwrap();

        assert_eq!(regs.read_count(), 0);
        assert_eq!(regs.write_log(), vec![(0x03, 0x3c)]);
    }

    #[test]
    fn field_spanning_registers() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.set(0x20, 0xab);
        regs.set(0x21, 0xcd);
        let f = field(0x20, 4, 12, Flags::empty());

        assert_eq!(f.nregs(), 2);
        assert_eq!(f.read(&regs).unwrap().to_string(), "0xcda");

        f.write(&regs, "0x123").unwrap();
        assert_eq!(regs.write_log(), vec![(0x20, 0x3b), (0x21, 0x12)]);
    }

    #[test]
    fn full_width_field() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        let f = field(0x40, 0, 32, Flags::empty());

        assert_eq!(f.nregs(), 4);
        f.write(&regs, "0xdeadbeef").unwrap();
        assert_eq!(regs.read_count(), 0);
        assert_eq!(f.read(&regs).unwrap().to_string(), "0xdeadbeef");
        assert_eq!(regs.get(0x40), 0xef);
        assert_eq!(regs.get(0x43), 0xde);
    }

    #[test]
    fn display_format() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.set(0x00, 0x05);

        assert_eq!(field(0x00, 0, 1, Flags::empty()).read(&regs).unwrap().to_string(), "1");
        assert_eq!(field(0x00, 0, 4, Flags::empty()).read(&regs).unwrap().to_string(), "0x5");
        assert_eq!(field(0x00, 0, 8, Flags::empty()).read(&regs).unwrap().to_string(), "0x05");
        assert_eq!(field(0x00, 0, 5, Flags::empty()).read(&regs).unwrap().to_string(), "0x05");
        assert_eq!(field(0x00, 0, 8, Flags::DECIMAL).read(&regs).unwrap().to_string(), "5");
    }

    #[test]
    fn integer_bases() {
        let f = field(0x00, 0, 8, Flags::empty());

        assert_eq!(f.parse("42").unwrap(), 42);
        assert_eq!(f.parse("0x2a\n").unwrap(), 42);
        assert_eq!(f.parse("0X2A").unwrap(), 42);
        assert_eq!(f.parse("052").unwrap(), 42);
        assert_eq!(f.parse("0").unwrap(), 0);
        assert_eq!(f.parse("+7").unwrap(), 7);

        for bad in ["", "\n", "08", "0x", "abc", "4 2", "-1", "256", "--1", "+-1", " 5", "5 ", "\t5", "5\n\n", "5\r\n"] {
            assert!(matches!(f.parse(bad), Err(Error::InvalidArgument(_))), "{:?}", bad);
        }
    }

    #[test]
    fn named_field_decodes_every_raw_value() {
        let _ = env_logger::try_init();

        for flags in [Flags::empty(), Flags::ACTIVE_LOW] {
            let f = RegisterField::new("led", 0x0a, 3, 2, Some(COLOURS), flags).unwrap();
            for raw in 0..=u8::MAX as u32 {
                assert!(matches!(f.decode(raw), FieldValue::Symbol(_)), "raw 0x{:x}", raw);
            }
        }

        let short = RegisterField::new("led", 0x0a, 0, 2, Some(THREE), Flags::empty());
        assert!(matches!(short, Err(Error::InvalidField(_))));
    }

    #[test]
    fn symbol_tokens() {
        let f = RegisterField::new("led", 0x0a, 0, 2, Some(COLOURS), Flags::empty()).unwrap();

        assert_eq!(f.parse("yellow\n").unwrap(), 1);
        assert_eq!(f.parse("  off trailing").unwrap(), 2);
        assert!(matches!(f.parse("blue"), Err(Error::InvalidArgument(_))));
        assert!(matches!(f.parse("1"), Err(Error::InvalidArgument(_))));
        assert!(matches!(f.parse(""), Err(Error::InvalidArgument(_))));
        assert!(matches!(f.parse("green_green_green_green"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn symbols_past_field_range_never_match() {
        const FIVE: &[&str] = &["a", "b", "c", "d", "e"];
        let f = RegisterField::new("wide", 0x00, 0, 2, Some(FIVE), Flags::empty()).unwrap();

        assert_eq!(f.parse("d").unwrap(), 3);
        assert!(matches!(f.parse("e"), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_bad_descriptions() {
        let _ = env_logger::try_init();

        let short = RegisterField::new("led", 0x10, 4, 2, Some(THREE), Flags::empty());
        assert!(matches!(short, Err(Error::InvalidField(_))));

        assert!(matches!(RegisterField::new("w0", 0, 0, 0, None, Flags::empty()), Err(Error::InvalidField(_))));
        assert!(matches!(RegisterField::new("w33", 0, 0, 33, None, Flags::empty()), Err(Error::InvalidField(_))));
        assert!(matches!(RegisterField::new("over", 0, 30, 4, None, Flags::empty()), Err(Error::InvalidField(_))));

        let signed_names = RegisterField::new("sn", 0, 0, 2, Some(COLOURS), Flags::SIGNED);
        assert!(matches!(signed_names, Err(Error::InvalidField(_))));
    }

    #[test]
    fn read_errors_propagate() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.fail_reads(true);

        let err = field(0x10, 3, 2, Flags::empty()).read(&regs).unwrap_err();
        assert_eq!(err.errno(), nix::errno::Errno::EIO);

        assert!(field(0x10, 3, 2, Flags::empty()).write(&regs, "1").is_err());
        assert_eq!(regs.write_count(), 0);
    }

    #[test]
    fn write_errors_propagate() {
        let _ = env_logger::try_init();
        let regs = SimRegisters::new();
        regs.fail_writes(true);

        let err = field(0x10, 0, 8, Flags::empty()).write(&regs, "1").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
