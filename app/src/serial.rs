/// USART1 link to the host: frame reports go out through an IRQ drained
/// queue, and received bytes are decoded into [`Command`]s in the interrupt.
///
pub mod uart1 {
    use crate::interrupt;
    use crate::hal::{
        pac,
        prelude::*,
        serial::{Event, Serial},
    };
    use crate::report::Command;
    use heapless::spsc::{Consumer, Producer, Queue};
    use stm32f0xx_hal::gpio::{gpiob, Alternate, AF0};

    // Fits a full frame line plus a jitter report
    const REPORT_Q_SIZE: usize = 256;
    const COMMAND_Q_SIZE: usize = 4;

    type TxPin = gpiob::PB6<Alternate<AF0>>;
    type RxPin = gpiob::PB7<Alternate<AF0>>;
    type Port = Serial<pac::USART1, TxPin, RxPin>;

    /// Everything the interrupt handler and the main loop share
    struct Link {
        port: Port,
        report_in: Producer<'static, u8, REPORT_Q_SIZE>,
        report_out: Consumer<'static, u8, REPORT_Q_SIZE>,
        command_in: Producer<'static, Command, COMMAND_Q_SIZE>,
        command_out: Consumer<'static, Command, COMMAND_Q_SIZE>,
    }

    static mut LINK: Option<Link> = None;

    fn link() -> &'static mut Link {
        unsafe { LINK.as_mut().unwrap_unchecked() }
    }

    /// Report sink for `core::fmt` output
    pub struct ReportWriter {}

    impl core::fmt::Write for ReportWriter {
        fn write_str(&mut self, s: &str) -> Result<(), core::fmt::Error> {
            let link = link();
            for b in s.bytes() {
                // Reports are best effort; a full queue drops the tail
                if link.report_in.enqueue(b).is_err() {
                    break;
                }
            }
            link.port.listen(Event::Txe);
            Ok(())
        }
    }

    /// Must be called once, before `writer` or `next_command`
    pub fn init(mut port: Port, irq_prio: u8) {
        static mut REPORT_Q: Queue<u8, REPORT_Q_SIZE> = Queue::new();
        static mut COMMAND_Q: Queue<Command, COMMAND_Q_SIZE> = Queue::new();

        port.listen(Event::Rxne);

        let (report_in, report_out) = unsafe { REPORT_Q.split() };
        let (command_in, command_out) = unsafe { COMMAND_Q.split() };

        let mut nvic = unsafe { pac::CorePeripherals::steal() }.NVIC;
        unsafe {
            LINK = Some(Link {
                port,
                report_in,
                report_out,
                command_in,
                command_out,
            });
            nvic.set_priority(pac::Interrupt::USART1, irq_prio);
            pac::NVIC::unmask(pac::Interrupt::USART1);
        }
    }

    /// Oldest command the host has sent and the main loop hasn't handled
    pub fn next_command() -> Option<Command> {
        link().command_out.dequeue()
    }

    pub fn writer() -> ReportWriter {
        ReportWriter {}
    }

    #[interrupt]
    fn USART1() {
        let link = link();

        // Unknown bytes are ignored, as are commands while the queue is full
        if let Some(command) = link.port.read().ok().and_then(Command::from_byte) {
            link.command_in.enqueue(command).ok();
        }

        let usart1 = unsafe { pac::Peripherals::steal().USART1 };
        if usart1.isr.read().txe().bit_is_set() {
            match link.report_out.dequeue() {
                Some(b) => {
                    link.port.write(b).ok();
                }
                None => link.port.unlisten(Event::Txe),
            }
        }
    }
}
