use shopfront::domain::{CategoryId, LineId, ProductId};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Products,
    Product(ProductId),
    Categories,
    Category(CategoryId),
    Cart,
    Add(ProductId, u32),
    Set(LineId, u32),
    Increase(LineId),
    Decrease(LineId),
    Remove(LineId),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  products                 list the catalog
  product <id>             show one product
  categories               list categories
  category <id>            list a category's products
  cart                     show the cart
  add <product> [qty]      add to cart (default 1)
  set <line> <qty>         set a line's quantity (0 removes it)
  inc <line> | dec <line>  change a line by one
  rm <line>                remove a line
  help | quit";

impl Command {
    pub fn parse(input: &str) -> Result<Self, String> {
        let mut parts = input.split_whitespace();
        let Some(name) = parts.next() else {
            return Err("empty command".to_string());
        };
        let args: Vec<&str> = parts.collect();

        let command = match (name, args.as_slice()) {
            ("products" | "ls", []) => Command::Products,
            ("product" | "show", [id]) => Command::Product(ProductId(number(id)?)),
            ("categories", []) => Command::Categories,
            ("category", [id]) => Command::Category(CategoryId(number(id)?)),
            ("cart", []) => Command::Cart,
            ("add", [id]) => Command::Add(ProductId(number(id)?), 1),
            ("add", [id, qty]) => Command::Add(ProductId(number(id)?), quantity(qty)?),
            ("set", [line, qty]) => Command::Set(line.parse()?, quantity(qty)?),
            ("inc", [line]) => Command::Increase(line.parse()?),
            ("dec", [line]) => Command::Decrease(line.parse()?),
            ("rm", [line]) => Command::Remove(line.parse()?),
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit", []) => Command::Quit,
            _ => return Err(format!("unrecognised command '{}', try 'help'", input.trim())),
        };
        Ok(command)
    }
}

fn number(raw: &str) -> Result<u64, String> {
    raw.parse().map_err(|_| format!("'{}' is not an id", raw))
}

fn quantity(raw: &str) -> Result<u32, String> {
    raw.parse().map_err(|_| format!("'{}' is not a quantity", raw))
}
