//! Whole-board bring-up tests
//!
//! One loopback bus stands in for both device windows; the block layer, tty
//! core and line discipline are fakes that record what they were given.

#[cfg(test)]
mod tests {
    use alloc::{sync::Arc, vec::Vec};
    use lib_kernel::{
        board::{imr, BoardConfig, BoardVariant, DuartLayout, IRQ_NUM_DUART, IRQ_NUM_IDE},
        irq::{IrqReturn, IrqTable, SoftIpl},
        loopback::LoopbackBus,
        KernelError,
    };
    use ide::{IdeHostHandle, IdeHostRegistry, IdePortInfo, Taskfile, TaskfileOps, TfValid};
    use serial::{regs::sr, FlipBuffer, RxStatus, SerialCore, UartDriver, UartOps};
    use spin::Mutex;

    use crate::{console, Board, Platform, CONSOLE_LINE};

    #[derive(Default)]
    struct Blocks {
        fail_alloc: bool,
        infos: Mutex<Vec<IdePortInfo>>,
        ops: Mutex<Option<Arc<dyn TaskfileOps>>>,
        freed: Mutex<Vec<IdeHostHandle>>,
    }

    impl IdeHostRegistry for Blocks {
        fn host_alloc(&self, info: &IdePortInfo, ops: Arc<dyn TaskfileOps>) -> Option<IdeHostHandle> {
            if self.fail_alloc {
                return None;
            }
            self.infos.lock().push(*info);
            *self.ops.lock() = Some(ops);
            Some(IdeHostHandle(1))
        }

        fn host_register(&self, _host: IdeHostHandle, _info: &IdePortInfo) -> Result<(), i32> {
            Ok(())
        }

        fn host_free(&self, host: IdeHostHandle) {
            self.freed.lock().push(host);
        }
    }

    #[derive(Default)]
    struct Tty {
        registered: Mutex<bool>,
        add_rc: i32,
        ports: Mutex<Vec<Arc<dyn UartOps>>>,
    }

    impl SerialCore for Tty {
        fn register_driver(&self, _driver: &UartDriver) -> Result<(), i32> {
            *self.registered.lock() = true;
            Ok(())
        }

        fn unregister_driver(&self, _driver: &UartDriver) {
            *self.registered.lock() = false;
        }

        fn add_one_port(&self, _driver: &UartDriver, _line: usize, ops: Arc<dyn UartOps>) -> Result<(), i32> {
            match self.add_rc {
                0 => {
                    self.ports.lock().push(ops);
                    Ok(())
                }
                rc => Err(rc),
            }
        }

        fn remove_one_port(&self, _driver: &UartDriver, _line: usize) {
            self.ports.lock().clear();
        }
    }

    #[derive(Default)]
    struct Ldisc {
        chars: Mutex<Vec<u8>>,
    }

    impl FlipBuffer for Ldisc {
        fn insert_char(&self, ch: u8, _status: RxStatus) {
            self.chars.lock().push(ch);
        }

        fn push(&self) {}
    }

    struct Fakes {
        irqs: Arc<IrqTable>,
        blocks: Arc<Blocks>,
        tty: Arc<Tty>,
        ldisc: Arc<Ldisc>,
        platform: Platform,
    }

    fn fakes_with(blocks: Blocks, tty: Tty) -> Fakes {
        let irqs = Arc::new(IrqTable::new());
        let blocks = Arc::new(blocks);
        let tty = Arc::new(tty);
        let ldisc = Arc::new(Ldisc::default());
        let platform = Platform {
            irqs: irqs.clone(),
            ipl: Arc::new(SoftIpl::new()),
            ldisc: ldisc.clone(),
            block: blocks.clone(),
            tty: tty.clone(),
        };
        Fakes { irqs, blocks, tty, ldisc, platform }
    }

    fn fakes() -> Fakes {
        fakes_with(Blocks::default(), Tty::default())
    }

    #[test]
    fn test_rev_a_brings_up_ide_and_serial() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let board = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevA), bus, &f.platform).unwrap();

        assert_eq!(board.ide_host(), Some(IdeHostHandle(1)));
        let info = f.blocks.infos.lock()[0];
        assert_eq!(info.data_addr, 0x00F7_F300);
        assert_eq!(info.irq, IRQ_NUM_IDE);

        assert!(*f.tty.registered.lock());
        assert_eq!(f.tty.ports.lock().len(), 1);
        let port = board.port(CONSOLE_LINE).unwrap();
        assert_eq!(port.fifosize(), 3);
        assert_eq!(port.variant(), BoardVariant::RevA);
    }

    #[test]
    fn test_rev_b_has_no_ide() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let board = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevB), bus, &f.platform).unwrap();

        assert_eq!(board.ide_host(), None);
        assert!(f.blocks.infos.lock().is_empty());
        assert_eq!(board.config().duart, DuartLayout::REV_B);
    }

    #[test]
    fn test_ide_alloc_failure_stops_bring_up() {
        let f = fakes_with(Blocks { fail_alloc: true, ..Blocks::default() }, Tty::default());
        let bus = Arc::new(LoopbackBus::new());
        let err = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevA), bus, &f.platform).err();

        assert_eq!(err, Some(KernelError::OutOfMemory));
        assert!(!*f.tty.registered.lock());
    }

    #[test]
    fn test_port_add_failure_unregisters_driver() {
        let f = fakes_with(Blocks::default(), Tty { add_rc: -5, ..Tty::default() });
        let bus = Arc::new(LoopbackBus::new());
        let err = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevB), bus, &f.platform).err();

        assert_eq!(err, Some(KernelError::Collaborator(-5)));
        assert!(!*f.tty.registered.lock());
    }

    #[test]
    fn test_serial_failure_frees_ide_host() {
        let f = fakes_with(Blocks::default(), Tty { add_rc: -5, ..Tty::default() });
        let bus = Arc::new(LoopbackBus::new());
        let err = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevA), bus, &f.platform).err();

        assert_eq!(err, Some(KernelError::Collaborator(-5)));
        assert_eq!(*f.blocks.freed.lock(), [IdeHostHandle(1)]);
        assert!(!*f.tty.registered.lock());
    }

    #[test]
    fn test_successful_bring_up_keeps_ide_host() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let board = Board::bring_up(BoardConfig::for_variant(BoardVariant::RevA), bus, &f.platform).unwrap();

        assert_eq!(board.ide_host(), Some(IdeHostHandle(1)));
        assert!(f.blocks.freed.lock().is_empty());
    }

    #[test]
    fn test_config_from_json_drives_bring_up() {
        let json = r#"{"variant":"RevA","duart":{"base":16248832,"lane":0},"ide_base":16249600}"#;
        let config: BoardConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config, BoardConfig::for_variant(BoardVariant::RevA));

        let f = fakes();
        let board = Board::bring_up(config, Arc::new(LoopbackBus::new()), &f.platform).unwrap();
        assert!(board.ide_host().is_some());
    }

    #[test]
    fn test_block_layer_drives_taskfile_through_board_bus() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let _board =
            Board::bring_up(BoardConfig::for_variant(BoardVariant::RevA), bus.clone(), &f.platform).unwrap();

        let ops = f.blocks.ops.lock().clone().unwrap();
        ops.load_taskfile(&Taskfile::lba28(0x10, 1, false), TfValid::NSECT | TfValid::LBAL);
        let regs = ide::IdeRegs::ddraig(0x00F7_F300);
        assert_eq!(bus.writes_to(regs.nsect), [1]);
        assert_eq!(bus.writes_to(regs.lbal), [0x10]);
    }

    #[test]
    fn test_open_receive_close() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let board =
            Board::bring_up(BoardConfig::for_variant(BoardVariant::RevB), bus.clone(), &f.platform).unwrap();
        let ops = f.tty.ports.lock()[0].clone();
        let port = board.port(CONSOLE_LINE).unwrap();
        let regs = *port.lock().regs();

        ops.startup().unwrap();
        assert_eq!(bus.latched(regs.imr), Some(imr::RXRDY));

        bus.set(regs.rhr, b'#');
        bus.set(regs.sr, sr::RXRDY);
        assert_eq!(f.irqs.dispatch(IRQ_NUM_DUART), IrqReturn::Handled);
        assert_eq!(*f.ldisc.chars.lock(), [b'#']);

        ops.shutdown();
        assert_eq!(f.irqs.dispatch(IRQ_NUM_DUART), IrqReturn::None);

        board.tear_down(&f.platform);
        assert!(f.tty.ports.lock().is_empty());
        assert!(!*f.tty.registered.lock());
    }

    #[test]
    fn test_console_carries_prints_and_log() {
        let f = fakes();
        let bus = Arc::new(LoopbackBus::new());
        let board =
            Board::bring_up(BoardConfig::for_variant(BoardVariant::RevB), bus.clone(), &f.platform).unwrap();
        let regs = *board.port(CONSOLE_LINE).unwrap().lock().regs();
        bus.set(regs.sr, sr::TXRDY);

        board.attach_console().unwrap();
        assert!(console::is_installed());
        assert_eq!(board.attach_console(), Err(KernelError::AlreadyInitialized));

        crate::serial_println!("boot {}", 2);
        let out = bus.writes_to(regs.rhr);
        assert!(out.windows(8).any(|w| w == b"boot 2\r\n"));

        lib_kernel::log_warn!("disk slow");
        let out = bus.writes_to(regs.rhr);
        // The logger may be busy with another test's message; only check
        // the line when it went through.
        if lib_kernel::logger::with_logger(|l| l.entries().any(|e| e.message() == "disk slow")) {
            assert!(out.windows(9).any(|w| w == b"disk slow"));
        }
    }
}
